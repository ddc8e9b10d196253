use crate::hash::Md5Hash;

/// Computes the lowercase hex MD5 digest of `bytes`.
pub fn md5_hex(bytes: &[u8]) -> Md5Hash {
    Md5Hash::from_digest(md5::compute(bytes))
}
