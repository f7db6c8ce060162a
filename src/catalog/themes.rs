// Built-in scenes

use std::path::PathBuf;

use super::{Sound, Theme};

const MARKET: &[(&str, &str)] = &[
    ("blacksmith_hammer", "Blacksmith's hammer"),
    ("people_talking", "People talking"),
    ("goose_feather", "Goose feather"),
    ("creaking_cart", "Creaking cart"),
    ("tavern_music", "Tavern music"),
    ("waffle_crunch", "Waffle crunch"),
    ("coin_clinking", "Coin clinking"),
    ("dog_barking", "Dog barking"),
];

const SHIP: &[(&str, &str)] = &[
    ("sail_flapping", "Sail flapping"),
    ("rope_creak", "Rope & pulley creak"),
    ("waves_splash", "Waves splashing"),
    ("deck_steps", "Footsteps on deck"),
    ("ship_bell", "Ship bell"),
    ("gulls", "Seagulls"),
];

const KITCHEN: &[(&str, &str)] = &[
    ("stew_bubbling", "Stew bubbling"),
    ("fire_crackle", "Hearth crackle"),
    ("knife_chop", "Knife chopping"),
    ("mortar_pestle", "Mortar & pestle"),
    ("dishes_clink", "Dishes clinking"),
    ("spoon_stir", "Wooden spoon stir"),
];

fn theme(id: &str, title: &str, sounds: &[(&str, &str)]) -> Theme {
    Theme {
        id: id.to_string(),
        title: title.to_string(),
        sounds: sounds
            .iter()
            .map(|(id, label)| Sound {
                id: id.to_string(),
                label: label.to_string(),
                file: PathBuf::from("sounds").join(format!("{id}.mp3")),
            })
            .collect(),
    }
}

pub(super) fn builtin_themes() -> Vec<Theme> {
    vec![
        theme("market", "Medieval Marketplace", MARKET),
        theme("ship", "Medieval Ship", SHIP),
        theme("kitchen", "Medieval Kitchen", KITCHEN),
    ]
}
