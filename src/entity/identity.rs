//! Customer identities and fixed staff names
//!
//! Identities only feed dialogue text; nothing in the simulation branches on them.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "man",
            Gender::Female => "woman",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub occupation: String,
    /// MBTI code with its nickname, e.g. "INTJ (Architect)"
    pub personality: String,
    pub mood: String,
    pub is_local: bool,
    /// Why they came in tonight. Filled in later by the text collaborator.
    pub motivation: Option<String>,
}

/// (min age, max age, probability)
const AGE_DISTRIBUTION: [(u8, u8, f64); 6] = [
    (18, 21, 0.25),
    (22, 30, 0.35),
    (31, 40, 0.25),
    (41, 50, 0.10),
    (51, 60, 0.04),
    (61, 99, 0.01),
];

const MALE_NAMES: [&str; 20] = [
    "Liam", "Noah", "Oliver", "Elijah", "James", "William", "Benjamin", "Lucas", "Henry",
    "Alexander", "Mason", "Michael", "Ethan", "Daniel", "Jacob", "Logan", "Jack", "Owen",
    "Samuel", "Leo",
];

const FEMALE_NAMES: [&str; 20] = [
    "Olivia", "Emma", "Ava", "Charlotte", "Sophia", "Amelia", "Isabella", "Mia", "Evelyn",
    "Harper", "Luna", "Ella", "Emily", "Scarlett", "Chloe", "Grace", "Nora", "Hazel", "Zoe",
    "Lucy",
];

const SURNAMES: [&str; 16] = [
    "Chen", "Wang", "Li", "Zhang", "Liu", "Smith", "Brown", "Garcia", "Tanaka", "Kim", "Müller",
    "Rossi", "Dubois", "Silva", "Novak", "Murphy",
];

/// (category probability, occupations)
const OCCUPATIONS: [(f64, &[&str]); 6] = [
    (
        0.30,
        &[
            "software engineer",
            "accountant",
            "marketing manager",
            "consultant",
            "designer",
        ],
    ),
    (0.20, &["student", "graduate student", "exchange student"]),
    (
        0.15,
        &["teacher", "nurse", "doctor", "civil servant", "librarian"],
    ),
    (0.15, &["chef", "shop owner", "barista", "hairdresser"]),
    (
        0.10,
        &["musician", "writer", "photographer", "actor", "painter"],
    ),
    (0.10, &["retiree", "freelancer", "tourist", "journalist"]),
];

const MBTI_TYPES: [(&str, &str); 16] = [
    ("INTJ", "Architect"),
    ("INTP", "Logician"),
    ("ENTJ", "Commander"),
    ("ENTP", "Debater"),
    ("INFJ", "Advocate"),
    ("INFP", "Mediator"),
    ("ENFJ", "Protagonist"),
    ("ENFP", "Campaigner"),
    ("ISTJ", "Logistician"),
    ("ISFJ", "Defender"),
    ("ESTJ", "Executive"),
    ("ESFJ", "Consul"),
    ("ISTP", "Virtuoso"),
    ("ISFP", "Adventurer"),
    ("ESTP", "Entrepreneur"),
    ("ESFP", "Entertainer"),
];

const MOODS: [&str; 20] = [
    "cheerful",
    "tired",
    "nostalgic",
    "restless",
    "content",
    "anxious",
    "celebratory",
    "melancholy",
    "curious",
    "bored",
    "relieved",
    "lonely",
    "excited",
    "pensive",
    "grumpy",
    "hopeful",
    "heartbroken",
    "playful",
    "calm",
    "stressed",
];

/// Fixed staff names, handed out in spawn order per role
pub const BARTENDER_NAMES: [&str; 3] = ["Diego Ramos", "Vivian", "Erhu"];
pub const WAITER_NAMES: [&str; 4] = ["Ah Hui", "Xiaoyu", "Brother Ma", "Zhenya"];
pub const CLEANER_NAMES: [&str; 1] = ["Auntie Wang"];
pub const POET_NAME: &str = "The Poet";
pub const MUSICIAN_NAME: &str = "Pianist";
pub const CAT_NAME: &str = "Mochi";
pub const SANTA_NAME: &str = "Santa";
pub const PLAYER_NAME: &str = "You";

fn roll_age<R: Rng>(rng: &mut R) -> u8 {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (min, max, p) in AGE_DISTRIBUTION {
        cumulative += p;
        if roll <= cumulative {
            return rng.gen_range(min..=max);
        }
    }
    rng.gen_range(18..=99)
}

fn roll_occupation<R: Rng>(rng: &mut R) -> String {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (p, options) in OCCUPATIONS {
        cumulative += p;
        if roll <= cumulative {
            if let Some(choice) = options.choose(rng) {
                return choice.to_string();
            }
        }
    }
    "freelancer".to_string()
}

impl Identity {
    /// Roll a random customer. Pass a gender to force it (mixed couples).
    pub fn generate<R: Rng>(rng: &mut R, gender: Option<Gender>) -> Self {
        let gender = gender.unwrap_or_else(|| Gender::random(rng));
        let first = match gender {
            Gender::Male => MALE_NAMES.choose(rng),
            Gender::Female => FEMALE_NAMES.choose(rng),
        }
        .copied()
        .unwrap_or("Guest");
        let surname = SURNAMES.choose(rng).copied().unwrap_or("Doe");
        let (code, nickname) = MBTI_TYPES.choose(rng).copied().unwrap_or(("ISFJ", "Defender"));
        let occupation = roll_occupation(rng);
        let is_local = occupation != "tourist" && rng.gen_bool(0.6);

        Self {
            name: format!("{first} {surname}"),
            age: roll_age(rng),
            gender,
            occupation,
            personality: format!("{code} ({nickname})"),
            mood: MOODS.choose(rng).copied().unwrap_or("calm").to_string(),
            is_local,
            motivation: None,
        }
    }

    /// MBTI code without the nickname
    pub fn mbti_code(&self) -> &str {
        self.personality
            .split_whitespace()
            .next()
            .unwrap_or(&self.personality)
    }

    /// Short card shown above the dialogue box
    pub fn display_line(&self) -> String {
        format!(
            "Customer, {}-year-old {}, {}, {}",
            self.age,
            self.gender.label(),
            self.occupation,
            self.mbti_code()
        )
    }

    /// Persona description handed to the text collaborator when a
    /// conversation opens
    pub fn persona_prompt(&self) -> String {
        let origin = if self.is_local { "a local" } else { "from out of town" };
        let mut prompt = format!(
            "You are {}, a {}-year-old {} working as a {}, {}. Personality: {}. Mood: {}.",
            self.name,
            self.age,
            self.gender.label(),
            self.occupation,
            origin,
            self.personality,
            self.mood
        );
        if let Some(motivation) = &self.motivation {
            prompt.push_str(&format!(" Why you came tonight: {motivation}"));
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generated_identity_fields_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let identity = Identity::generate(&mut rng, None);
            assert!((18..=99).contains(&identity.age));
            assert!(identity.motivation.is_none());
            assert_eq!(identity.mbti_code().len(), 4);
            assert!(identity.name.contains(' '));
        }
    }

    #[test]
    fn test_forced_gender() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let identity = Identity::generate(&mut rng, Some(Gender::Female));
        assert_eq!(identity.gender, Gender::Female);
        let first = identity.name.split(' ').next().unwrap_or_default();
        assert!(FEMALE_NAMES.contains(&first));
    }

    #[test]
    fn test_age_distribution_skews_young() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let ages: Vec<u8> = (0..2000).map(|_| roll_age(&mut rng)).collect();
        let under_31 = ages.iter().filter(|&&a| a <= 30).count() as f64 / ages.len() as f64;
        assert!(under_31 > 0.5 && under_31 < 0.7, "share under 31 was {}", under_31);
    }

    #[test]
    fn test_persona_prompt_includes_motivation() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut identity = Identity::generate(&mut rng, None);
        assert!(!identity.persona_prompt().contains("Why you came"));
        identity.motivation = Some("Long week, need a quiet drink".into());
        assert!(identity.persona_prompt().contains("quiet drink"));
    }
}
