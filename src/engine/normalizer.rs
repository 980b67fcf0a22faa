//! Item key normalization.
//!
//! Auction names carry decorations that don't change what the item is
//! worth as a base: `[Lvl 42]` pet levels, dungeon stars and reforge
//! prefixes. Stripping them and appending the rarity tier gives a key under
//! which comparable listings group together.

/// Cosmetic tokens removed from item names, applied in this order.
/// Matching is literal and case-sensitive.
pub const MODIFIER_CATALOG: &[&str] = &[
    " ✦", "⚚ ", " ✪", "✪", "Stiff ", "Lucky ", "Jerry's ", "Dirty ", "Fabled ",
    "Suspicious ", "Gilded ", "Warped ", "Withered ", "Bulky ", "Stellar ", "Heated ",
    "Ambered ", "Fruitful ", "Magnetic ", "Fleet ", "Mithraic ", "Auspicious ", "Refined ",
    "Headstrong ", "Precise ", "Spiritual ", "Moil ", "Blessed ", "Toil ", "Bountiful ",
    "Candied ", "Submerged ", "Reinforced ", "Cubic ", "Undead ", "Ridiculous ",
    "Necrotic ", "Spiked ", "Jaded ", "Loving ", "Perfect ", "Renowned ", "Giant ",
    "Empowered ", "Ancient ", "Sweet ", "Silky ", "Bloody ", "Shaded ", "Gentle ", "Odd ",
    "Fast ", "Fair ", "Epic ", "Sharp ", "Heroic ", "Spicy ", "Legendary ", "Deadly ",
    "Fine ", "Grand ", "Hasty ", "Neat ", "Rapid ", "Unreal ", "Awkward ", "Rich ",
    "Clean ", "Fierce ", "Heavy ", "Light ", "Mythic ", "Pure ", "Smart ", "Titanic ",
    "Wise ", "Bizarre ", "Itchy ", "Ominous ", "Pleasant ", "Pretty ", "Shiny ", "Simple ",
    "Strange ", "Vivid ", "Godly ", "Demonic ", "Forceful ", "Hurtful ", "Keen ", "Strong ",
    "Superior ", "Unpleasant ", "Zealous ",
];

/// Build the baseline key for an item name and tier.
///
/// Removes every `[...]` span, then every catalog token, then appends the
/// tier verbatim. Never fails.
pub fn normalize(display_name: &str, tier: &str) -> String {
    let mut key = strip_brackets(display_name);
    for token in MODIFIER_CATALOG {
        if key.contains(token) {
            key = key.replace(token, "");
        }
    }
    key.push_str(tier);
    key
}

/// Remove `[` up to the next `]`, inclusive. An unclosed `[` is kept along
/// with everything after it.
fn strip_brackets(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;

    while let Some(open) = rest.find('[') {
        match rest[open..].find(']') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
