use crate::mood::MoodCategory;
use rand::seq::IndexedRandom;
use rand::Rng;

const HAPPY: &[&str] = &[
    "Your smile is your superpower! Keep shining bright! ✨",
    "Happiness looks beautiful on you! Spread that joy! 😊",
    "You're radiating positive energy - the world needs more of that! 🌟",
];

const SAD: &[&str] = &[
    "Every storm runs out of rain. This feeling will pass. 🌈",
    "You're stronger than you know. Take it one moment at a time. 💪",
    "It's okay to not be okay. Be gentle with yourself today. 🤗",
];

const ANGRY: &[&str] = &[
    "Take a deep breath. You have the power to choose peace. 🧘‍♀️",
    "Your feelings are valid. Channel that energy into something positive. ⚡",
    "Sometimes we need to feel the fire to appreciate the calm. 🔥",
];

const NEUTRAL: &[&str] = &[
    "You look great today! Ready to make it amazing? ✨",
    "Every new moment is a chance for something wonderful. 🌅",
    "You have everything within you to create a beautiful day. 🎨",
];

const SURPRISED: &[&str] = &[
    "Life is full of wonderful surprises - embrace them! 🎉",
    "Your curiosity and wonder make you special. Stay amazed! 👀",
    "Surprise moments often lead to the best memories. 📸",
];

pub fn quotes_for(mood: MoodCategory) -> &'static [&'static str] {
    match mood {
        MoodCategory::Happy => HAPPY,
        MoodCategory::Sad => SAD,
        MoodCategory::Angry => ANGRY,
        MoodCategory::Neutral => NEUTRAL,
        MoodCategory::Surprised => SURPRISED,
    }
}

pub fn pick_quote<R: Rng + ?Sized>(mood: MoodCategory, rng: &mut R) -> &'static str {
    quotes_for(mood).choose(rng).copied().unwrap_or_default()
}
