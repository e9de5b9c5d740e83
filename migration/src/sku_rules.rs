//! SKU derivation rules for `authorized_part`.
//!
//! A SKU is derived from a part number by an ordered table of prefix rules,
//! evaluated first-match-wins. Part numbers matching no rule fall back to the
//! bare `SKU-<part_number>` form, so every input yields a SKU.

use std::fmt;

/// Maximum length of the `sku` column, in characters.
pub const SKU_MAX_LEN: usize = 50;

const SKU_PREFIX: &str = "SKU-";

/// One entry of the rule table: part numbers starting with `prefix`
/// (case-sensitive) get `-<suffix>` appended to their SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuRule {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl SkuRule {
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    pub fn matches(&self, part_number: &str) -> bool {
        part_number.starts_with(self.prefix)
    }

    pub fn format(&self, part_number: &str) -> String {
        format!("{}{}-{}", SKU_PREFIX, part_number, self.suffix)
    }
}

/// Component families recognised by the backfill, in priority order.
pub const DEFAULT_RULES: &[SkuRule] = &[
    SkuRule::new("PCB", "PCB"),
    SkuRule::new("CAP", "CAP"),
    SkuRule::new("RES", "RES"),
];

/// Derived SKU that does not fit in the `sku` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuTooLong {
    pub part_number: String,
    pub sku: String,
}

impl SkuTooLong {
    pub fn sku_len(&self) -> usize {
        self.sku.chars().count()
    }
}

impl fmt::Display for SkuTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "derived sku '{}' for part_number '{}' is {} characters (max {})",
            self.sku,
            self.part_number,
            self.sku_len(),
            SKU_MAX_LEN
        )
    }
}

impl std::error::Error for SkuTooLong {}

/// Ordered rule table with a catch-all fallback.
#[derive(Debug, Clone, Copy)]
pub struct SkuRules {
    rules: &'static [SkuRule],
}

impl Default for SkuRules {
    fn default() -> Self {
        Self::new(DEFAULT_RULES)
    }
}

impl SkuRules {
    pub const fn new(rules: &'static [SkuRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [SkuRule] {
        self.rules
    }

    /// First rule matching `part_number`, if any.
    pub fn rule_for(&self, part_number: &str) -> Option<&'static SkuRule> {
        self.rules.iter().find(|rule| rule.matches(part_number))
    }

    /// Derive the SKU for `part_number`. Never fails and ignores the column
    /// bound; use [`SkuRules::derive_checked`] before writing.
    pub fn derive(&self, part_number: &str) -> String {
        match self.rule_for(part_number) {
            Some(rule) => rule.format(part_number),
            None => format!("{}{}", SKU_PREFIX, part_number),
        }
    }

    /// Derive the SKU and reject values longer than [`SKU_MAX_LEN`].
    /// Overlong values are never truncated.
    pub fn derive_checked(&self, part_number: &str) -> Result<String, SkuTooLong> {
        let sku = self.derive(part_number);
        if sku.chars().count() > SKU_MAX_LEN {
            return Err(SkuTooLong {
                part_number: part_number.to_string(),
                sku,
            });
        }
        Ok(sku)
    }
}

/// Derive a SKU with the default rule table.
pub fn derive_sku(part_number: &str) -> String {
    SkuRules::default().derive(part_number)
}
