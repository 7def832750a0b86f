/// Maps a string key onto one of `total_shards` buckets.
///
/// Variant assignment uses the sharder so that the same user always lands in the same variant of
/// an experiment without any stored state.
pub trait Sharder {
    /// Return the shard of `input`, in `0..total_shards`. `total_shards` must be non-zero.
    fn get_shard(&self, input: &str, total_shards: u64) -> u64;
}

/// Sharder using the first four bytes of the MD5 digest.
pub struct Md5Sharder;

impl Sharder for Md5Sharder {
    fn get_shard(&self, input: &str, total_shards: u64) -> u64 {
        let digest = md5::compute(input);
        let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        u64::from(prefix) % total_shards
    }
}

#[cfg(test)]
pub struct DeterministicSharder(pub std::collections::HashMap<String, u64>);

#[cfg(test)]
impl Sharder for DeterministicSharder {
    fn get_shard(&self, input: &str, total_shards: u64) -> u64 {
        self.0.get(input).copied().unwrap_or(0) % total_shards
    }
}
