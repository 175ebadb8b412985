use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 16;

/// Hash commitment to a cylinder layout, published before the first
/// trigger pull and opened once the cylinder is retired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutCommitment {
    digest: Vec<u8>,
    nonce: Vec<u8>,
}

impl LayoutCommitment {
    pub fn seal<R: Rng + ?Sized>(layout: &[bool], rng: &mut R) -> Self {
        let mut nonce = vec![0u8; NONCE_LEN];
        rng.fill(&mut nonce[..]);

        Self {
            digest: hash_layout(layout, &nonce),
            nonce,
        }
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    pub fn nonce_hex(&self) -> String {
        hex::encode(&self.nonce)
    }

    /// Check a revealed layout and nonce against a published digest.
    pub fn verify(digest_hex: &str, layout: &[bool], nonce_hex: &str) -> bool {
        let (Ok(digest), Ok(nonce)) = (hex::decode(digest_hex), hex::decode(nonce_hex)) else {
            return false;
        };
        hash_layout(layout, &nonce) == digest
    }
}

fn hash_layout(layout: &[bool], nonce: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update((layout.len() as u32).to_be_bytes());
    for &loaded in layout {
        hasher.update([u8::from(loaded)]);
    }
    hasher.update(nonce);
    hasher.finalize().to_vec()
}
