const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Compute the 32-bit FNV-1a hash of a name.
///
/// This is the identity used for type names and field names, the value
/// never depends on addresses or process state.
///
/// # Examples
///
/// ```
/// use vc_utils::hash::fnv1a_32;
///
/// assert_eq!(fnv1a_32(""), 0x811c_9dc5);
/// assert_eq!(fnv1a_32("a"), 0xe40c_292c);
/// ```
#[inline]
pub const fn fnv1a_32(name: &str) -> u32 {
    fnv1a_32_bytes(name.as_bytes())
}

/// Compute the 32-bit FNV-1a hash of raw bytes.
pub const fn fnv1a_32_bytes(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET;
    let mut index = 0;
    while index < bytes.len() {
        hash ^= bytes[index] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        index += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_values() {
        assert_eq!(fnv1a_32(""), 0x811c_9dc5);
        assert_eq!(fnv1a_32("a"), 0xe40c_292c);
        assert_eq!(fnv1a_32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn str_and_bytes_agree() {
        assert_eq!(fnv1a_32("game::Player"), fnv1a_32_bytes(b"game::Player"));
        assert_ne!(fnv1a_32("game::Player"), fnv1a_32("game::player"));
    }

    #[test]
    fn usable_in_const() {
        const HASH: u32 = fnv1a_32("i32");
        assert_eq!(HASH, fnv1a_32("i32"));
    }
}
