const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the raw key bytes. Other brokers compute the same value
/// independently, so the constants must not change.
pub fn hash_routing_key(key: &str) -> u32 {
    key.as_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Keyed messages get a stable affinity hash; unkeyed ones are spread at random.
pub fn routing_hash_for(routing_key: &str) -> u32 {
    if routing_key.is_empty() {
        return rand::random::<u32>();
    }

    hash_routing_key(routing_key)
}
