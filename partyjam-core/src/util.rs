use rand::{distributions::Alphanumeric, seq::SliceRandom, thread_rng, Rng};

/// The characters a join code may contain
const JOIN_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The length of a shareable join code
pub const JOIN_CODE_LENGTH: usize = 6;

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Generates a human-shareable uppercase alphanumeric join code
pub fn random_join_code() -> String {
    let mut rng = thread_rng();

    (0..JOIN_CODE_LENGTH)
        .map(|_| {
            *JOIN_CODE_CHARSET
                .choose(&mut rng)
                .expect("charset is not empty") as char
        })
        .collect()
}

/// Draws up to `size` items uniformly at random, without replacement
pub fn random_sample<T: Clone>(items: &[T], size: usize) -> Vec<T> {
    let mut rng = thread_rng();
    items.choose_multiple(&mut rng, size).cloned().collect()
}
