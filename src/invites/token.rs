use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes of entropy per invite token (192 bits).
const TOKEN_BYTES: usize = 24;

/// Produces unguessable invite tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws tokens from the OS entropy source, hex-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        // OsRng panics if the platform RNG is unavailable; there is no
        // sensible recovery from that.
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}
