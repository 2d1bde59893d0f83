use uuid::Uuid;

// IFC's base64 alphabet; differs from RFC 4648 in order and the last two
// characters
const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// A fresh 22-character IFC GlobalId.
#[must_use]
pub fn new_global_id() -> String {
    compress(Uuid::new_v4())
}

/// Compresses a 128-bit UUID into the 22-character IFC GlobalId form.
#[must_use]
pub fn compress(uuid: Uuid) -> String {
    let n = uuid.as_u128();
    let mut out = String::with_capacity(22);

    // First character holds the top two bits, the rest six bits each
    out.push(char::from(ALPHABET[(n >> 126) as usize]));
    for i in 1..22 {
        let shift = 6 * (21 - i);
        out.push(char::from(ALPHABET[((n >> shift) & 0x3f) as usize]));
    }

    out
}
