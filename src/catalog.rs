//! Static lookup tables shared by every request.
//!
//! Built once at startup and only ever read afterwards, so the catalog is held
//! behind an `Arc` in `AppState` without any lock.

use std::collections::HashMap;

/// Economic knobs attached to a quiz question by difficulty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyModifiers {
  pub correct: f64,
  pub wrong: f64,
  pub steal: f64,
  pub amount: f64,
}

#[derive(Clone, Debug)]
pub struct PersonalityProfile {
  pub description: &'static str,
  pub strengths: [&'static str; 3],
  pub growth: [&'static str; 3],
}

pub const DEFAULT_CATEGORY: &str = "Science";
pub const DEFAULT_DIFFICULTY: &str = "Medium";

pub const CATEGORIES: [&str; 4] = ["Science", "Technology", "Mathematics", "Engineering"];
pub const DIFFICULTIES: [&str; 3] = ["Easy", "Medium", "Hard"];

/// Psychology prompt categories, in questionnaire order. Their first three
/// characters are the trait axis code.
pub const PSYCHOLOGY_CATEGORIES: [&str; 8] = [
  "E/I_Social", "E/I_Energy",
  "S/N_Information", "S/N_Future",
  "T/F_Decisions", "T/F_Conflict",
  "J/P_Structure", "J/P_Deadlines",
];

pub const PERSONALITY_TRAITS: [&str; 4] = [
  "Extroversion/Introversion", "Sensing/Intuition", "Thinking/Feeling", "Judging/Perceiving",
];

pub const PERSONALITY_TYPES: [&str; 16] = [
  "INTJ", "INTP", "ENTJ", "ENTP",
  "INFJ", "INFP", "ENFJ", "ENFP",
  "ISTJ", "ISFJ", "ESTJ", "ESFJ",
  "ISTP", "ISFP", "ESTP", "ESFP",
];

pub const GENERIC_TITLE: &str = "Unique Personality";
pub const GENERIC_DESCRIPTION: &str = "A distinctive personality pattern with unique traits.";
pub const GENERIC_STRENGTHS: [&str; 3] = ["Unique perspective", "Personal authenticity", "Individual strengths"];
pub const GENERIC_GROWTH: [&str; 3] = ["Continued learning", "Skill development", "Personal growth"];

pub struct Catalog {
  difficulty: HashMap<&'static str, DifficultyModifiers>,
  subcategories: Vec<(&'static str, [&'static str; 4])>,
  profiles: HashMap<&'static str, PersonalityProfile>,
}

impl Catalog {
  pub fn new() -> Self {
    Self {
      difficulty: difficulty_table(),
      subcategories: vec![
        ("Science", ["Physics", "Chemistry", "Biology", "Earth Science"]),
        ("Technology", ["Programming", "Computer Science", "AI", "Networking"]),
        ("Mathematics", ["Algebra", "Geometry", "Calculus", "Statistics"]),
        ("Engineering", ["Civil", "Mechanical", "Electrical", "Software"]),
      ],
      profiles: profile_table(),
    }
  }

  /// Modifiers for `difficulty`, falling back to Medium for unknown names.
  pub fn modifiers(&self, difficulty: &str) -> DifficultyModifiers {
    self
      .difficulty
      .get(difficulty)
      .or_else(|| self.difficulty.get(DEFAULT_DIFFICULTY))
      .copied()
      .unwrap_or(DifficultyModifiers { correct: 0.8, wrong: 1.3, steal: 15.0, amount: 5.0 })
  }

  /// Canonical category name used for prompts and counters.
  pub fn resolve_category<'a>(&self, category: &'a str) -> &'a str {
    if CATEGORIES.contains(&category) { category } else { DEFAULT_CATEGORY }
  }

  pub fn categories_map(&self) -> Vec<(String, Vec<String>)> {
    self
      .subcategories
      .iter()
      .map(|(cat, subs)| (cat.to_string(), subs.iter().map(|s| s.to_string()).collect()))
      .collect()
  }

  pub fn profile(&self, personality_type: &str) -> Option<&PersonalityProfile> {
    self.profiles.get(personality_type)
  }
}

impl Default for Catalog {
  fn default() -> Self {
    Self::new()
  }
}

fn difficulty_table() -> HashMap<&'static str, DifficultyModifiers> {
  HashMap::from([
    ("Easy", DifficultyModifiers { correct: 0.9, wrong: 1.1, steal: 5.0, amount: 2.0 }),
    ("Medium", DifficultyModifiers { correct: 0.8, wrong: 1.3, steal: 15.0, amount: 5.0 }),
    ("Hard", DifficultyModifiers { correct: 0.6, wrong: 1.5, steal: 25.0, amount: 10.0 }),
  ])
}

macro_rules! profile {
  ($ty:literal, $desc:literal, [$($s:literal),+], [$($g:literal),+]) => {
    ($ty, PersonalityProfile { description: $desc, strengths: [$($s),+], growth: [$($g),+] })
  };
}

fn profile_table() -> HashMap<&'static str, PersonalityProfile> {
  HashMap::from([
    profile!("INTJ", "The Architect - Strategic, independent, and driven by their vision.",
      ["Strategic thinking", "Independent problem-solving", "Long-term vision"],
      ["Interpersonal communication", "Flexibility", "Patience"]),
    profile!("INTP", "The Thinker - Analytical, innovative, and fascinated by concepts.",
      ["Logical analysis", "Creative problem-solving", "Intellectual curiosity"],
      ["Follow-through", "Practical application", "Time management"]),
    profile!("ENTJ", "The Commander - Bold, strategic leaders who organize resources.",
      ["Leadership", "Strategic planning", "Decision-making"],
      ["Patience", "Active listening", "Work-life balance"]),
    profile!("ENTP", "The Debater - Curious, innovative, and excellent at generating ideas.",
      ["Innovation", "Enthusiasm", "Communication"],
      ["Focus and follow-through", "Attention to detail", "Routine tasks"]),
    profile!("INFJ", "The Advocate - Idealistic, principled, and driven to help others.",
      ["Empathy", "Insight", "Idealism"],
      ["Assertiveness", "Practical decisions", "Self-care"]),
    profile!("INFP", "The Mediator - Creative, caring, and guided by values.",
      ["Authenticity", "Creativity", "Compassion"],
      ["Structure", "Deadlines", "Conflict handling"]),
    profile!("ENFJ", "The Protagonist - Charismatic, inspiring leaders who care about others.",
      ["Inspiring others", "Communication", "Empathy"],
      ["Personal boundaries", "Self-focus", "Saying no"]),
    profile!("ENFP", "The Campaigner - Enthusiastic, creative, and socially free-spirited.",
      ["Enthusiasm", "Creativity", "People skills"],
      ["Organization", "Follow-through", "Detail attention"]),
    profile!("ISTJ", "The Logistician - Practical, reliable, and committed to duties.",
      ["Reliability", "Organization", "Attention to detail"],
      ["Flexibility", "Innovation", "Emotional expression"]),
    profile!("ISFJ", "The Protector - Caring, loyal, and ready to defend loved ones.",
      ["Caring nature", "Loyalty", "Supportiveness"],
      ["Assertiveness", "Personal needs", "Change adaptation"]),
    profile!("ESTJ", "The Executive - Organized, practical leaders who get things done.",
      ["Leadership", "Organization", "Efficiency"],
      ["Emotional awareness", "Flexibility", "Patience"]),
    profile!("ESFJ", "The Consul - Caring, social, and eager to help others succeed.",
      ["People skills", "Organization", "Loyalty"],
      ["Personal boundaries", "Criticism handling", "Self-advocacy"]),
    profile!("ISTP", "The Virtuoso - Practical, observant, skilled at understanding things.",
      ["Problem-solving", "Practical skills", "Adaptability"],
      ["Long-term planning", "Emotional expression", "Teamwork"]),
    profile!("ISFP", "The Adventurer - Gentle, caring, eager to explore possibilities.",
      ["Creativity", "Empathy", "Authenticity"],
      ["Assertiveness", "Structure", "Conflict engagement"]),
    profile!("ESTP", "The Entrepreneur - Energetic, perceptive, skilled at adapting.",
      ["Adaptability", "People skills", "Problem-solving"],
      ["Long-term planning", "Detail attention", "Reflection"]),
    profile!("ESFP", "The Entertainer - Enthusiastic, spontaneous, eager to help others have fun.",
      ["Enthusiasm", "People skills", "Creativity"],
      ["Organization", "Long-term focus", "Criticism handling"]),
  ])
}
