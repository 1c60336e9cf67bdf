//! Closed allow-list of rare drops that count as a pet acquisition.
//!
//! The golden beam effect is reused for other valuable drops, so only these
//! names (lowercase) mark a subject's pet as obtained.

pub const PET_ITEM_NAMES: &[&str] = &[
    "king black dragon scale",
    "kalphite egg",
    "shrivelled dagannoth claw",
    "dagannoth egg",
    "dagannoth scale",
    "ribs of chaos",
    "rotten fang",
    "giant feather",
    "auburn lock",
    "decaying tooth",
    "severed hoof",
    "blood-soaked feather",
    "blood tentacle",
    "corporeal bone",
    "volcanic shard",
    "queen black dragon scale",
    "kalphite claw",
    "corrupted ascension signet i",
    "corrupted ascension signet ii",
    "corrupted ascension signet iii",
    "corrupted ascension signet iv",
    "corrupted ascension signet v",
    "corrupted ascension signet vi",
    "ancient summoning stone",
    "ancient artefact",
    "araxyte egg",
    "durzag's helmet",
    "yakamaru's helmet",
    "faceless mask",
    "twisted antler",
    "avaryss' braid",
    "nymora's braid",
    "imbued blade slice",
    "glimmering scale",
    "telos' tendril",
    "soul fragment",
    "imbued bark shard",
    "chipped black stone crystal",
    "inert black stone crystal",
    "umbral urn",
    "broken shackle",
    "pristine bagrada rex egg",
    "pristine pavosaurus rex egg",
    "pristine corbicula rex egg",
    "kerapac's mask piece",
    "glacor core",
    "croesus's enriched root",
    "tzkal-zuk's armour piece",
    "jewels of zamorak",
    "hermod's armour spike",
    "miso's collar",
    "vorkath's claw",
    "calcified heart",
    "clawdia's shell clippings",
    "nefthys' tooth",
    "fragment of the gate",
    "amascut's promise",
    "snowverload's nose",
    "mhekarnahz's eye",
];

/// Case-insensitive exact match after trimming.
pub fn is_pet_item(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    PET_ITEM_NAMES.iter().any(|&pet| pet == name)
}
