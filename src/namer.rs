//! Mapping of SPIR-V result IDs to sanitized, globally unique identifiers.
//!
//! One [`Namer`] lives for exactly one parse. It is seeded with the WGSL
//! reserved words so no generated identifier can collide with a keyword,
//! and it guarantees that no two IDs ever resolve to the same name.

use crate::FxHashMap;
use lazy_static::lazy_static;

lazy_static! {
    /// WGSL keywords and reserved identifiers. Seeded into every `Namer`.
    static ref RESERVED_WORDS: Vec<&'static str> = vec![
        "array", "as", "asm", "bf16", "binding", "block", "bool", "break", "builtin", "case",
        "cast", "compute", "const", "continue", "continuing", "default", "discard", "do", "else",
        "elseif", "entry_point", "enum", "f16", "f32", "fallthrough", "false", "fn", "for",
        "fragment", "function", "i8", "i16", "i32", "i64", "if", "image", "import", "in", "let",
        "location", "loop", "mat2x2", "mat2x3", "mat2x4", "mat3x2", "mat3x3", "mat3x4", "mat4x2",
        "mat4x3", "mat4x4", "offset", "out", "premerge", "private", "ptr", "regardless", "return",
        "sampler", "sampler_comparison", "set", "storage", "struct", "switch", "true", "type",
        "typedef", "u8", "u16", "u32", "u64", "uniform", "uniform_constant", "unless", "var",
        "vec2", "vec3", "vec4", "vertex", "void", "while", "workgroup",
        "texture_1d", "texture_2d", "texture_2d_array", "texture_3d", "texture_cube",
        "texture_cube_array", "texture_multisampled_2d", "texture_depth_2d",
        "texture_depth_2d_array", "texture_depth_cube", "texture_depth_cube_array",
    ];
}

/// Allocates and remembers names for SPIR-V IDs.
#[derive(Default)]
pub struct Namer {
    /// At most one name per ID; a second registration for the same ID is a
    /// hard invariant violation.
    id_to_name: FxHashMap<u32, String>,
    /// Every name ever handed out (or reserved), for collision detection.
    /// Reserved words and derived names map to ID 0.
    name_to_id: FxHashMap<String, u32>,
    /// User suggestions for struct member names, keyed by struct ID, then
    /// member index.
    suggested_member_names: FxHashMap<u32, FxHashMap<u32, String>>,
    /// Final member names per struct ID, in member order.
    resolved_member_names: FxHashMap<u32, Vec<String>>,
}

impl Namer {
    pub fn new() -> Self {
        let mut namer = Self::default();
        for word in RESERVED_WORDS.iter() {
            namer.name_to_id.insert((*word).to_string(), 0);
        }
        namer
    }

    /// Rewrites `name` into a valid identifier: characters outside
    /// `[A-Za-z0-9_]` become `_`, a leading digit or underscore gets an `x`
    /// prefix, and the empty string becomes `"empty"`.
    ///
    /// Idempotent on anything that is already a valid identifier.
    pub fn sanitize(name: &str) -> String {
        if name.is_empty() {
            return "empty".to_string();
        }
        let mut result = String::with_capacity(name.len() + 1);
        let mut chars = name.chars();
        let first = chars.next().unwrap();
        if first.is_ascii_alphabetic() {
            result.push(first);
        } else if first.is_ascii_digit() || first == '_' {
            result.push('x');
            result.push(if first == '_' { '_' } else { first });
        } else {
            result.push('x');
            result.push('_');
        }
        for ch in chars {
            result.push(if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' });
        }
        result
    }

    /// Is this exact name already taken (by an ID, a derived name, or a
    /// reserved word)?
    pub fn is_registered(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Does `id` already have a name?
    pub fn has_name(&self, id: u32) -> bool {
        self.id_to_name.contains_key(&id)
    }

    /// The registered name for `id`; generates and registers an `x_<id>`
    /// fallback if the ID was never named.
    pub fn name(&mut self, id: u32) -> String {
        if let Some(name) = self.id_to_name.get(&id) {
            return name.clone();
        }
        let derived = self.find_unused_derived_name(&format!("x_{id}"));
        // The derived name is fresh, so this cannot fail.
        let saved = self.save_name(id, &derived);
        debug_assert!(saved);
        derived
    }

    /// The registered name for `id`, or the `x_<id>` fallback, without
    /// registering anything. For diagnostics only; [`Self::name`] is the
    /// allocating lookup.
    pub fn display_name(&self, id: u32) -> String {
        self.id_to_name.get(&id).cloned().unwrap_or_else(|| format!("x_{id}"))
    }

    /// Registers `name` for `id`. Returns false if `id` already has a name:
    /// that is a parser bug, not bad input, and the caller must fail.
    pub fn save_name(&mut self, id: u32, name: &str) -> bool {
        if self.has_name(id) {
            return false;
        }
        self.id_to_name.insert(id, name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        true
    }

    /// Reserves `name` without mapping any ID to it, so later derived names
    /// cannot take it. Returns false if the name is already registered.
    pub fn register_without_id(&mut self, name: &str) -> bool {
        if self.is_registered(name) {
            return false;
        }
        self.name_to_id.insert(name.to_string(), 0);
        true
    }

    /// Returns the first of `base`, `base_1`, `base_2`, ... not yet taken.
    /// Does not register the result.
    pub fn find_unused_derived_name(&self, base: &str) -> String {
        if !self.is_registered(base) {
            return base.to_string();
        }
        let mut i = 1u32;
        loop {
            let candidate = format!("{base}_{i}");
            if !self.is_registered(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    /// Sanitizes `base`, disambiguates it, registers it (with no ID), and
    /// returns it. Used for synthesized helpers: phi variables, flow guards,
    /// temporaries.
    pub fn make_derived_name(&mut self, base: &str) -> String {
        let name = self.find_unused_derived_name(&Self::sanitize(base));
        self.name_to_id.insert(name.clone(), 0);
        name
    }

    /// Suggests a name for `id`: a no-op returning false if `id` is already
    /// named, otherwise sanitizes and disambiguates the suggestion, registers
    /// the result, and returns true.
    pub fn suggest_sanitized_name(&mut self, id: u32, suggested: &str) -> bool {
        if self.has_name(id) {
            return false;
        }
        let name = self.find_unused_derived_name(&Self::sanitize(suggested));
        self.save_name(id, &name)
    }

    /// Records a user suggestion for a struct member name. First suggestion
    /// for a given member wins.
    pub fn suggest_sanitized_member_name(
        &mut self,
        struct_id: u32,
        member_index: u32,
        suggested: &str,
    ) -> bool {
        let members = self.suggested_member_names.entry(struct_id).or_default();
        if members.contains_key(&member_index) {
            return false;
        }
        members.insert(member_index, Self::sanitize(suggested));
        true
    }

    /// Fixes the final member names for a struct.
    ///
    /// Two phases, in this order: user-suggested names are disambiguated
    /// first (preserving as many originals as possible), and only then are
    /// unnamed members synthesized as `field<index>` and disambiguated
    /// against the now-fixed set. Doing it the other way around would let a
    /// late synthesized name take a slot an earlier user name wanted.
    pub fn resolve_member_names_for_struct(&mut self, struct_id: u32, member_count: u32) {
        let suggestions = self.suggested_member_names.remove(&struct_id).unwrap_or_default();
        let mut used: FxHashMap<String, ()> = FxHashMap::default();
        let mut resolved: Vec<Option<String>> = vec![None; member_count as usize];

        let disambiguate = |used: &FxHashMap<String, ()>, base: &str| -> String {
            if !used.contains_key(base) {
                return base.to_string();
            }
            let mut i = 1u32;
            loop {
                let candidate = format!("{base}_{i}");
                if !used.contains_key(&candidate) {
                    return candidate;
                }
                i += 1;
            }
        };

        for index in 0..member_count {
            if let Some(suggested) = suggestions.get(&index) {
                let name = disambiguate(&used, suggested);
                used.insert(name.clone(), ());
                resolved[index as usize] = Some(name);
            }
        }
        for index in 0..member_count {
            if resolved[index as usize].is_none() {
                let name = disambiguate(&used, &format!("field{index}"));
                used.insert(name.clone(), ());
                resolved[index as usize] = Some(name);
            }
        }

        self.resolved_member_names
            .insert(struct_id, resolved.into_iter().map(Option::unwrap).collect());
    }

    /// The resolved name of a struct member; `field<index>` if the struct
    /// was never resolved (e.g. for diagnostics on malformed input).
    pub fn member_name(&self, struct_id: u32, member_index: u32) -> String {
        self.resolved_member_names
            .get(&struct_id)
            .and_then(|names| names.get(member_index as usize))
            .cloned()
            .unwrap_or_else(|| format!("field{member_index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_basics() {
        assert_eq!(Namer::sanitize(""), "empty");
        assert_eq!(Namer::sanitize("abc"), "abc");
        assert_eq!(Namer::sanitize("a.b-c"), "a_b_c");
        assert_eq!(Namer::sanitize("9lives"), "x9lives");
        assert_eq!(Namer::sanitize("_private"), "x_private");
        assert_eq!(Namer::sanitize("__double"), "x__double");
        assert_eq!(Namer::sanitize("\u{1F600}"), "x_");
    }

    #[test]
    fn sanitize_is_idempotent_on_valid_identifiers() {
        for name in ["abc", "x9lives", "a_b_c", "Value2", "x__double"] {
            assert_eq!(Namer::sanitize(&Namer::sanitize(name)), Namer::sanitize(name));
        }
    }

    #[test]
    fn suggestions_disambiguate_in_call_order() {
        let mut namer = Namer::new();
        assert!(namer.suggest_sanitized_name(1, "work"));
        assert!(namer.suggest_sanitized_name(2, "work"));
        assert!(namer.suggest_sanitized_name(3, "work"));
        assert_eq!(namer.name(1), "work");
        assert_eq!(namer.name(2), "work_1");
        assert_eq!(namer.name(3), "work_2");
    }

    #[test]
    fn suggestion_is_a_noop_for_named_ids() {
        let mut namer = Namer::new();
        assert!(namer.suggest_sanitized_name(1, "first"));
        assert!(!namer.suggest_sanitized_name(1, "second"));
        assert_eq!(namer.name(1), "first");
    }

    #[test]
    fn reserved_words_are_avoided() {
        let mut namer = Namer::new();
        assert!(namer.suggest_sanitized_name(1, "loop"));
        assert_eq!(namer.name(1), "loop_1");
    }

    #[test]
    fn save_name_fails_on_second_registration() {
        let mut namer = Namer::new();
        assert!(namer.save_name(1, "a"));
        assert!(!namer.save_name(1, "b"));
        assert_eq!(namer.name(1), "a");
    }

    #[test]
    fn unnamed_ids_get_stable_fallbacks() {
        let mut namer = Namer::new();
        assert_eq!(namer.name(14), "x_14");
        assert_eq!(namer.name(14), "x_14");
    }

    #[test]
    fn member_names_resolve_user_suggestions_before_synthesis() {
        let mut namer = Namer::new();
        // Member 1 claims "field0"; the synthesized name for member 0 must
        // step aside, not the user's choice.
        assert!(namer.suggest_sanitized_member_name(100, 1, "field0"));
        namer.resolve_member_names_for_struct(100, 2);
        assert_eq!(namer.member_name(100, 1), "field0");
        assert_eq!(namer.member_name(100, 0), "field0_1");
    }

    #[test]
    fn member_names_unique_within_struct() {
        let mut namer = Namer::new();
        assert!(namer.suggest_sanitized_member_name(100, 0, "alpha"));
        assert!(namer.suggest_sanitized_member_name(100, 1, "alpha"));
        namer.resolve_member_names_for_struct(100, 3);
        assert_eq!(namer.member_name(100, 0), "alpha");
        assert_eq!(namer.member_name(100, 1), "alpha_1");
        assert_eq!(namer.member_name(100, 2), "field2");
    }

    #[test]
    fn derived_names_never_collide() {
        let mut namer = Namer::new();
        assert!(namer.suggest_sanitized_name(1, "temp"));
        let derived = namer.make_derived_name("temp");
        assert_eq!(derived, "temp_1");
        assert!(namer.is_registered("temp_1"));
    }
}
