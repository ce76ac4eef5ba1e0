//! Content Hashing
//!
//! Every cached object is keyed by a 128-bit [`ContentHash`] computed with
//! streaming XXH3 over the canonical `bincode` encoding of its description,
//! followed by the backend discriminator and, for shaders, the debug bit.
//!
//! The hash is rendered as a [`HashString`](make_hash_str), which doubles as
//! the archive entry name of the serialized object.
//!
//! # Versioning
//!
//! Hash values are only stable for a given [`HASHER_VERSION`]. Archives record
//! the version they were written with and are rejected when it differs, so a
//! hasher change forces a clean rebuild instead of silently missing every
//! lookup.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::errors::Result;
use crate::graphics::objects::Shader;
use crate::graphics::pipeline::{PipelineStateCreateInfo, PipelineTemplate};
use crate::graphics::render_pass::RenderPassDesc;
use crate::graphics::shader::ShaderCreateInfo;
use crate::graphics::signature::PipelineResourceSignatureDesc;
use crate::graphics::{RenderDeviceInfo, RenderDeviceType};

/// Version of the hashing scheme. Bump whenever any input or its encoding
/// changes.
pub const HASHER_VERSION: u32 = 1;

/// 128-bit content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ContentHash {
    pub low: u64,
    pub high: u64,
}

impl ContentHash {
    #[inline]
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            low: value as u64,
            high: (value >> 64) as u64,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    pub fn of_shader(ci: &ShaderCreateInfo, device_hash: u64, is_debug: bool) -> Result<Self> {
        ContentHasher::shader_hash(ci, device_hash, is_debug)
    }

    pub fn of_pipeline(ci: &PipelineStateCreateInfo, device_hash: u64) -> Result<Self> {
        ContentHasher::pipeline_hash(ci, device_hash)
    }

    pub fn of_signature(desc: &PipelineResourceSignatureDesc, device_type: RenderDeviceType) -> Result<Self> {
        ContentHasher::signature_hash(desc, device_type)
    }

    pub fn of_render_pass(desc: &RenderPassDesc, device_type: RenderDeviceType) -> Result<Self> {
        ContentHasher::render_pass_hash(desc, device_type)
    }
}

/// 32 upper-case hex digits, high half first.
impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}{:016X}", self.high, self.low)
    }
}

/// Renders a hash as 32 upper-case hex digits.
#[must_use]
pub fn hash_to_str(hash: ContentHash) -> String {
    hash.to_string()
}

/// Builds the HashString `"<name> [<hex>]"`, or only `<hex>` without a name.
#[must_use]
pub fn make_hash_str(name: Option<&str>, hash: ContentHash) -> String {
    match name {
        Some(name) => format!("{name} [{hash}]"),
        None => hash.to_string(),
    }
}

// ─── Content Hasher ──────────────────────────────────────────────────────────

/// Streaming hasher. Inputs are fed in call order; the order is part of the
/// hash definition.
pub struct ContentHasher {
    state: Xxh3,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.state.update(bytes);
    }

    /// Feeds a length-prefixed byte blob.
    pub fn update_blob(&mut self, bytes: &[u8]) {
        self.update_u64(bytes.len() as u64);
        self.state.update(bytes);
    }

    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.state.update(&value.to_le_bytes());
    }

    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.state.update(&value.to_le_bytes());
    }

    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.state.update(&[u8::from(value)]);
    }

    /// Feeds the canonical encoding of `value`.
    pub fn update<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        bincode::serialize_into(&mut *self, value)?;
        Ok(())
    }

    #[must_use]
    pub fn digest(&self) -> ContentHash {
        ContentHash::from_u128(self.state.digest128())
    }

    // ── Object Descriptions ──────────────────────────────────────────────

    /// Feeds a shader create info. File sources must already be resolved.
    pub fn update_shader_create_info(&mut self, ci: &ShaderCreateInfo) -> Result<()> {
        self.update(ci)
    }

    /// Feeds a live shader by content: description without its name, then
    /// bytecode. Renaming a shader does not change pipelines that use it.
    pub fn update_shader_object(&mut self, shader: &dyn Shader) -> Result<()> {
        let mut desc = shader.desc();
        desc.name.clear();
        self.update(&desc)?;
        self.update_blob(&shader.bytecode());
        Ok(())
    }

    /// Feeds a pipeline create info, including the full content of every
    /// referenced signature, render pass and shader.
    pub fn update_pipeline_create_info(&mut self, ci: &PipelineStateCreateInfo) -> Result<()> {
        let template = PipelineTemplate::from_create_info(ci);
        self.update(&template.desc)?;
        self.update(&template.kind)?;

        let signatures = ci.resource_signatures();
        self.update_u32(signatures.len() as u32);
        for sign in signatures {
            self.update(&sign.desc())?;
        }

        match ci.render_pass() {
            Some(render_pass) => {
                self.update_bool(true);
                self.update(&render_pass.desc())?;
            }
            None => self.update_bool(false),
        }

        let mut result = Ok(());
        ci.for_each_shader_slot(|slot| {
            if result.is_err() {
                return;
            }
            match slot {
                Some(shader) => {
                    self.update_bool(true);
                    result = self.update_shader_object(shader.as_ref());
                }
                None => self.update_bool(false),
            }
        });
        result
    }

    // ── One-shot Helpers ─────────────────────────────────────────────────

    pub fn shader_hash(ci: &ShaderCreateInfo, device_hash: u64, is_debug: bool) -> Result<ContentHash> {
        let mut hasher = Self::new();
        hasher.update_shader_create_info(ci)?;
        hasher.update_u64(device_hash);
        hasher.update_bool(is_debug);
        Ok(hasher.digest())
    }

    pub fn pipeline_hash(ci: &PipelineStateCreateInfo, device_hash: u64) -> Result<ContentHash> {
        let mut hasher = Self::new();
        hasher.update_pipeline_create_info(ci)?;
        hasher.update_u64(device_hash);
        Ok(hasher.digest())
    }

    pub fn signature_hash(
        desc: &PipelineResourceSignatureDesc,
        device_type: RenderDeviceType,
    ) -> Result<ContentHash> {
        let mut hasher = Self::new();
        hasher.update(desc)?;
        hasher.update_u32(device_type as u32);
        Ok(hasher.digest())
    }

    pub fn render_pass_hash(desc: &RenderPassDesc, device_type: RenderDeviceType) -> Result<ContentHash> {
        let mut hasher = Self::new();
        hasher.update(desc)?;
        hasher.update_u32(device_type as u32);
        Ok(hasher.digest())
    }

    /// Hash of the device attributes that change generated code: device
    /// type, NDC depth range and separable program support.
    #[must_use]
    pub fn device_hash(info: &RenderDeviceInfo) -> u64 {
        let mut hasher = Self::new();
        hasher.update_u32(info.device_type as u32);
        hasher.update_u32(info.ndc.min_z.to_bits());
        hasher.update_bool(info.features.separable_programs);
        hasher.digest().low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_string_puts_high_half_first() {
        let hash = ContentHash {
            low: 0x0123_4567_89AB_CDEF,
            high: 0xFEDC_BA98_7654_3210,
        };
        assert_eq!(hash_to_str(hash), "FEDCBA98765432100123456789ABCDEF");
    }

    #[test]
    fn hash_string_pads_to_32_digits() {
        let hash = ContentHash { low: 1, high: 0 };
        let text = hash_to_str(hash);
        assert_eq!(text.len(), 32);
        assert!(text.ends_with("01"));
    }

    #[test]
    fn make_hash_str_brackets_hex_after_name() {
        let hash = ContentHash { low: 0xAB, high: 0 };
        assert_eq!(
            make_hash_str(Some("Foo"), hash),
            "Foo [000000000000000000000000000000AB]"
        );
        assert_eq!(make_hash_str(None, hash), "000000000000000000000000000000AB");
    }

    #[test]
    fn u128_round_trip() {
        let value = 0x1122_3344_5566_7788_99AA_BBCC_DDEE_FF00_u128;
        assert_eq!(ContentHash::from_u128(value).as_u128(), value);
    }

    #[test]
    fn digest_depends_on_feed_order() {
        let mut a = ContentHasher::new();
        a.update_u32(1);
        a.update_u32(2);
        let mut b = ContentHasher::new();
        b.update_u32(2);
        b.update_u32(1);
        assert_ne!(a.digest(), b.digest());
    }
}
