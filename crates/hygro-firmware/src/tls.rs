//! TLS 1.3 transport with certificate-fingerprint pinning.
//!
//! The publisher talks to exactly one server, identified by the SHA-256
//! fingerprint of its leaf certificate baked in at build time. The
//! verifier accepts a handshake only if the presented certificate
//! hashes to the pinned value; CA chain validation and hostname checks
//! are intentionally not performed — pinning replaces them, and rejects
//! interception on an open or compromised network regardless of what a
//! CA would say.

use embedded_tls::{
    Aes128GcmSha256, Certificate, CertificateRef, CertificateVerify, CryptoProvider, TlsCipherSuite,
    TlsError, TlsVerifier,
};
use sha2::{Digest, Sha256};

/// Accepts exactly one server certificate, by SHA-256 fingerprint.
pub struct PinnedVerifier {
    fingerprint: [u8; 32],
}

impl PinnedVerifier {
    pub const fn new(fingerprint: [u8; 32]) -> Self {
        Self { fingerprint }
    }
}

impl<CipherSuite: TlsCipherSuite> TlsVerifier<CipherSuite> for PinnedVerifier {
    fn set_hostname_verification(&mut self, _hostname: &str) -> Result<(), TlsError> {
        // Identity is established by the fingerprint, not the hostname.
        Ok(())
    }

    fn verify_certificate(
        &mut self,
        _transcript: &CipherSuite::Hash,
        _ca: &Option<Certificate>,
        cert: CertificateRef,
    ) -> Result<(), TlsError> {
        let leaf = cert
            .entries
            .iter()
            .find_map(|entry| match entry {
                embedded_tls::CertificateEntryRef::X509(der) => Some(*der),
                _ => None,
            })
            .ok_or(TlsError::InvalidCertificate)?;

        let digest = Sha256::digest(leaf);
        if digest.as_slice() == self.fingerprint {
            Ok(())
        } else {
            log::error!("server certificate fingerprint mismatch; refusing connection");
            Err(TlsError::InvalidCertificate)
        }
    }

    fn verify_signature(&mut self, _verify: CertificateVerify) -> Result<(), TlsError> {
        Ok(())
    }
}

/// Crypto provider wiring the hardware RNG to the pinned verifier.
pub struct PinnedCryptoProvider<RNG> {
    rng: RNG,
    verifier: PinnedVerifier,
}

impl<RNG> PinnedCryptoProvider<RNG> {
    pub fn new(rng: RNG, fingerprint: [u8; 32]) -> Self {
        Self {
            rng,
            verifier: PinnedVerifier::new(fingerprint),
        }
    }
}

impl<RNG> CryptoProvider for PinnedCryptoProvider<RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, TlsError> {
        Ok(&mut self.verifier)
    }
}

/// `rand_core` adapter over the chip's hardware RNG.
#[derive(Clone, Copy)]
pub struct HalRng(esp_hal::rng::Rng);

impl HalRng {
    pub fn new(rng: esp_hal::rng::Rng) -> Self {
        Self(rng)
    }
}

impl rand_core::RngCore for HalRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        ((self.0.random() as u64) << 32) | self.0.random() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.0.random().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for HalRng {}
