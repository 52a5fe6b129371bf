//! Built-in content for practice without a model provider.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::error::GenerationError;
use crate::generator::{
    MistakeCategorizer, MistakeCategory, SentenceGenerator, SentenceRequest, WordListGenerator,
    WordListRequest,
};
use crate::session::setup::{Difficulty, Topic, VocabType};

const GENERAL_EASY: &[&str] = &[
    "apple", "happy", "little", "friend", "school", "water", "because", "garden", "family",
    "yellow", "window", "animal", "summer", "pencil", "rabbit",
];
const GENERAL_MEDIUM: &[&str] = &[
    "beautiful", "bicycle", "knowledge", "enormous", "delicious", "separate", "favorite",
    "neighbor", "February", "library", "surprise", "whistle", "believe", "different", "answer",
];
const GENERAL_HARD: &[&str] = &[
    "extraordinary", "magnificent", "conscientious", "necessary", "embarrass", "occurrence",
    "rhythm", "privilege", "definitely", "accommodate", "mischievous", "questionnaire",
    "millennium", "pronunciation", "bouquet",
];
const SCIENCE_EASY: &[&str] = &[
    "plant", "seed", "rain", "cloud", "magnet", "insect", "energy", "rock", "moon", "planet",
    "shadow", "weather", "root", "fossil", "liquid",
];
const SCIENCE_MEDIUM: &[&str] = &[
    "molecule", "gravity", "habitat", "orbit", "mineral", "volcano", "nucleus", "oxygen",
    "climate", "organism", "electric", "evaporate", "skeleton", "telescope", "predator",
];
const SCIENCE_HARD: &[&str] = &[
    "photosynthesis", "chlorophyll", "chromosome", "hypothesis", "equilibrium", "metamorphosis",
    "atmosphere", "thermometer", "precipitation", "respiration", "microscope", "psychology",
    "ecosystem", "biodiversity", "pneumonia",
];
const HISTORY_EASY: &[&str] = &[
    "king", "queen", "castle", "map", "flag", "ship", "town", "leader", "farm", "past", "war",
    "peace", "crown", "village", "journey",
];
const HISTORY_MEDIUM: &[&str] = &[
    "colony", "empire", "pyramid", "ancient", "pioneer", "treaty", "citizen", "knight",
    "monarch", "explorer", "revolution", "democracy", "century", "frontier", "harvest",
];
const HISTORY_HARD: &[&str] = &[
    "renaissance", "archaeology", "constitution", "parliament", "sovereignty", "aristocracy",
    "civilization", "independence", "reconnaissance", "mercenary", "bureaucracy", "chronicle",
    "hieroglyphics", "feudalism", "amendment",
];

const GENERAL_SENTENCES: &[&str] = &[
    "The quick brown fox jumps over the lazy dog near the river.",
    "After school we walked to the park and played until the sun went down.",
    "My grandmother bakes fresh bread every Sunday morning for the whole family.",
    "The library was quiet except for the soft sound of turning pages.",
    "A small boat drifted slowly across the calm lake at dawn.",
    "We packed sandwiches, apples and water before we started the long hike.",
];
const SCIENCE_SENTENCES: &[&str] = &[
    "Plants use sunlight, water and air to make the food they need to grow.",
    "The moon does not make its own light but reflects light from the sun.",
    "Water turns into vapor when it is heated and becomes ice when it freezes.",
    "Bees carry pollen from flower to flower, which helps new seeds form.",
    "A magnet pulls on iron and steel but has no effect on wood or plastic.",
    "Volcanoes form where hot melted rock rises up through cracks in the crust.",
];
const HISTORY_SENTENCES: &[&str] = &[
    "The ancient Egyptians built huge pyramids as tombs for their kings.",
    "Explorers once sailed for months across the ocean without knowing what they would find.",
    "Castles had thick stone walls and deep moats to keep enemies out.",
    "The printing press made books cheaper and helped ideas spread quickly.",
    "Many early towns grew up beside rivers where people could farm and trade.",
    "Roman roads were so well built that some of them are still used today.",
];
const FACTS_SENTENCES: &[&str] = &[
    "An octopus has three hearts and blue blood.",
    "Honey found in ancient tombs was still safe to eat after thousands of years.",
    "A day on Venus is longer than a year on Venus.",
    "The heart of a blue whale is about the size of a small car.",
    "Bananas are berries, but strawberries are not.",
    "Lightning is about five times hotter than the surface of the sun.",
];

pub fn word_bank(vocab: VocabType, difficulty: Difficulty) -> &'static [&'static str] {
    match (vocab, difficulty) {
        (VocabType::General, Difficulty::Easy) => GENERAL_EASY,
        (VocabType::General, Difficulty::Medium) => GENERAL_MEDIUM,
        (VocabType::General, Difficulty::Hard) => GENERAL_HARD,
        (VocabType::Science, Difficulty::Easy) => SCIENCE_EASY,
        (VocabType::Science, Difficulty::Medium) => SCIENCE_MEDIUM,
        (VocabType::Science, Difficulty::Hard) => SCIENCE_HARD,
        (VocabType::History, Difficulty::Easy) => HISTORY_EASY,
        (VocabType::History, Difficulty::Medium) => HISTORY_MEDIUM,
        (VocabType::History, Difficulty::Hard) => HISTORY_HARD,
    }
}

fn sentence_bank(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::General => GENERAL_SENTENCES,
        Topic::Science => SCIENCE_SENTENCES,
        Topic::History => HISTORY_SENTENCES,
        Topic::Facts => FACTS_SENTENCES,
    }
}

/// Words listed after `Correct: [` in a past-performance digest, lowercased.
pub fn previously_correct(past_performance: &str) -> HashSet<String> {
    let mut words = HashSet::new();
    let mut rest = past_performance;
    while let Some(start) = rest.find("Correct: [") {
        rest = &rest[start + "Correct: [".len()..];
        let Some(end) = rest.find(']') else {
            break;
        };
        words.extend(
            rest[..end]
                .split(',')
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        rest = &rest[end..];
    }
    words
}

pub struct OfflineGenerator {
    rng: SmallRng,
}

impl Default for OfflineGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineGenerator {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl WordListGenerator for OfflineGenerator {
    fn generate_word_list(
        &mut self,
        request: &WordListRequest,
    ) -> Result<Vec<String>, GenerationError> {
        let known = previously_correct(&request.past_performance);
        let target = request.target_len() as usize;

        let mut fresh: Vec<&str> = Vec::new();
        let mut repeats: Vec<&str> = Vec::new();
        // Requested difficulty first, then the others of the same vocabulary.
        let mut difficulties = vec![request.difficulty];
        difficulties.extend(
            [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
                .into_iter()
                .filter(|d| *d != request.difficulty),
        );
        for difficulty in difficulties {
            let mut bank = word_bank(request.vocab_type, difficulty).to_vec();
            bank.shuffle(&mut self.rng);
            for word in bank {
                if known.contains(&word.to_lowercase()) {
                    repeats.push(word);
                } else {
                    fresh.push(word);
                }
            }
            if fresh.len() >= target {
                break;
            }
        }
        // Only fall back to already mastered words when the banks run dry.
        fresh.extend(repeats);
        fresh.truncate(target);
        Ok(fresh.into_iter().map(str::to_string).collect())
    }
}

impl SentenceGenerator for OfflineGenerator {
    fn generate_sentence(&mut self, request: &SentenceRequest) -> Result<String, GenerationError> {
        let mut bank = sentence_bank(request.topic).to_vec();
        bank.shuffle(&mut self.rng);

        let mut parts: Vec<&str> = Vec::new();
        let mut words = 0;
        for sentence in bank.iter().cycle() {
            if words >= request.word_count as usize {
                break;
            }
            words += sentence.split_whitespace().count();
            parts.push(*sentence);
        }
        Ok(parts.join(" "))
    }
}

/// Label for a misspelled word from simple orthographic patterns.
pub fn classify(word: &str) -> &'static str {
    let w = word.to_lowercase();
    let chars: Vec<char> = w.chars().collect();
    let silent = ["kn", "wr", "gn", "mb", "ght", "ps", "rh"];
    let vowel_teams = ["ie", "ei", "ea", "ou", "ai", "oa", "ui"];
    let affixes = ["tion", "sion", "ing", "ed", "ly", "ful", "ous", "ence", "ance"];

    if silent.iter().any(|s| w.contains(s)) {
        "Silent Letters"
    } else if chars.windows(2).any(|p| p[0] == p[1] && !"aeiou".contains(p[0])) {
        "Doubled Consonants"
    } else if affixes.iter().any(|s| w.ends_with(s)) {
        "Suffix/Prefix Rules"
    } else if vowel_teams.iter().any(|s| w.contains(s)) {
        "Vowel Teams"
    } else {
        "Irregular Spellings"
    }
}

impl MistakeCategorizer for OfflineGenerator {
    fn categorize(&mut self, words: &[String]) -> Result<Vec<MistakeCategory>, GenerationError> {
        let mut categories: Vec<MistakeCategory> = Vec::new();
        for word in words {
            let label = classify(word);
            match categories.iter_mut().find(|c| c.category == label) {
                Some(c) => c.count += 1,
                None => categories.push(MistakeCategory {
                    category: label.to_string(),
                    count: 1,
                }),
            }
        }
        Ok(categories)
    }
}
