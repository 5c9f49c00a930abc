//! Inferred usage of sampler and image handles.
//!
//! Each sampler or image memory object declaration accumulates a [`Usage`]
//! record as the module's image instructions are scanned. The record is
//! strictly monotonic: bits are only ever added, so scanning order cannot
//! change the outcome, and equivalent access paths (direct, via copies, via
//! access chains, via function parameters) converge on the same record.

use std::fmt;

/// Monotonic usage record for one handle declaration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    is_sampler: bool,
    is_comparison_sampler: bool,

    is_texture: bool,
    is_sampled: bool,
    is_multisampled: bool,
    is_depth: bool,
    is_storage_read: bool,
    is_storage_write: bool,
}

impl Usage {
    /// No contradictory bits set. Note that a default (empty) usage is valid.
    pub fn is_valid(&self) -> bool {
        if self.is_sampler && self.is_texture {
            return false;
        }
        if !self.is_sampler && self.is_comparison_sampler {
            return false;
        }
        if !self.is_texture
            && (self.is_sampled
                || self.is_multisampled
                || self.is_depth
                || self.is_storage_read
                || self.is_storage_write)
        {
            return false;
        }
        // Storage access contradicts sampled/depth/multisampled use, and a
        // texture cannot be both read and written as storage.
        let storage = self.is_storage_read || self.is_storage_write;
        if storage && (self.is_sampled || self.is_depth || self.is_multisampled) {
            return false;
        }
        if self.is_storage_read && self.is_storage_write {
            return false;
        }
        // A depth texture is never multisampled in WGSL.
        if self.is_depth && self.is_multisampled {
            return false;
        }
        true
    }

    /// Valid, and with enough bits to pick exactly one WGSL handle type.
    pub fn is_complete(&self) -> bool {
        self.is_valid() && (self.is_sampler || self.is_texture)
    }

    pub fn is_sampler(&self) -> bool {
        self.is_sampler
    }

    pub fn is_comparison_sampler(&self) -> bool {
        self.is_comparison_sampler
    }

    pub fn is_texture(&self) -> bool {
        self.is_texture
    }

    pub fn is_sampled_texture(&self) -> bool {
        self.is_sampled
    }

    pub fn is_multisampled_texture(&self) -> bool {
        self.is_multisampled
    }

    pub fn is_depth_texture(&self) -> bool {
        self.is_depth
    }

    pub fn is_storage_read_texture(&self) -> bool {
        self.is_storage_read
    }

    pub fn is_storage_write_texture(&self) -> bool {
        self.is_storage_write
    }

    pub fn add_sampler(&mut self) {
        self.is_sampler = true;
    }

    pub fn add_comparison_sampler(&mut self) {
        self.add_sampler();
        self.is_comparison_sampler = true;
    }

    pub fn add_texture(&mut self) {
        self.is_texture = true;
    }

    pub fn add_sampled_texture(&mut self) {
        self.add_texture();
        self.is_sampled = true;
    }

    pub fn add_multisampled_texture(&mut self) {
        self.add_sampled_texture();
        self.is_multisampled = true;
    }

    /// Depth-reference access implies usage as a (sampled) depth texture.
    pub fn add_depth_texture(&mut self) {
        self.add_sampled_texture();
        self.is_depth = true;
    }

    pub fn add_storage_read_texture(&mut self) {
        self.add_texture();
        self.is_storage_read = true;
    }

    pub fn add_storage_write_texture(&mut self) {
        self.add_texture();
        self.is_storage_write = true;
    }

    /// Unions another usage into this one (used to propagate a callee's
    /// formal-parameter usage onto the caller's actual argument).
    pub fn add(&mut self, other: &Usage) {
        self.is_sampler |= other.is_sampler;
        self.is_comparison_sampler |= other.is_comparison_sampler;
        self.is_texture |= other.is_texture;
        self.is_sampled |= other.is_sampled;
        self.is_multisampled |= other.is_multisampled;
        self.is_depth |= other.is_depth;
        self.is_storage_read |= other.is_storage_read;
        self.is_storage_write |= other.is_storage_write;
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Usage(")?;
        let mut sep = "";
        let mut flag = |f: &mut fmt::Formatter<'_>, set: bool, name: &str| -> fmt::Result {
            if set {
                write!(f, "{sep}{name}")?;
                sep = " ";
            }
            Ok(())
        };
        flag(f, self.is_sampler, "Sampler")?;
        flag(f, self.is_comparison_sampler, "Comparison")?;
        flag(f, self.is_texture, "Texture")?;
        flag(f, self.is_sampled, "Sampled")?;
        flag(f, self.is_multisampled, "Multisampled")?;
        flag(f, self.is_depth, "Depth")?;
        flag(f, self.is_storage_read, "StorageRead")?;
        flag(f, self.is_storage_write, "StorageWrite")?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_usage_is_valid_but_incomplete() {
        let usage = Usage::default();
        assert!(usage.is_valid());
        assert!(!usage.is_complete());
    }

    #[test]
    fn sampler_and_texture_contradict() {
        let mut usage = Usage::default();
        usage.add_sampler();
        usage.add_sampled_texture();
        assert!(!usage.is_valid());
    }

    #[test]
    fn storage_write_and_sampled_contradict() {
        let mut usage = Usage::default();
        usage.add_storage_write_texture();
        usage.add_sampled_texture();
        assert!(!usage.is_valid());
    }

    #[test]
    fn storage_read_and_write_contradict() {
        let mut usage = Usage::default();
        usage.add_storage_read_texture();
        usage.add_storage_write_texture();
        assert!(!usage.is_valid());
    }

    #[test]
    fn depth_implies_sampled() {
        let mut usage = Usage::default();
        usage.add_depth_texture();
        assert!(usage.is_complete());
        assert!(usage.is_sampled_texture());
        assert!(usage.is_depth_texture());
    }

    #[test]
    fn union_is_order_independent() {
        let mut a = Usage::default();
        a.add_depth_texture();
        let mut b = Usage::default();
        b.add_sampled_texture();

        let mut ab = a;
        ab.add(&b);
        let mut ba = b;
        ba.add(&a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn accumulation_is_monotonic() {
        let mut usage = Usage::default();
        usage.add_sampled_texture();
        let before = usage;
        usage.add_sampled_texture();
        assert_eq!(usage, before);
    }

    #[test]
    fn comparison_sampler_display_names_both_flags() {
        let mut usage = Usage::default();
        usage.add_comparison_sampler();
        assert_eq!(usage.to_string(), "Usage(Sampler Comparison)");
    }
}
