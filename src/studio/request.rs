use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {field} '{value}' (expected one of: {expected})")]
pub struct UnknownChoice {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TattooSize {
    Small,
    Medium,
    Large,
}

impl TattooSize {
    pub fn label(self) -> &'static str {
        match self {
            TattooSize::Small => "Piccolo",
            TattooSize::Medium => "Medio",
            TattooSize::Large => "Grande",
        }
    }
}

impl fmt::Display for TattooSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TattooSize {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "piccolo" | "small" => Ok(TattooSize::Small),
            "medio" | "medium" => Ok(TattooSize::Medium),
            "grande" | "large" => Ok(TattooSize::Large),
            _ => Err(UnknownChoice {
                field: "size",
                value: value.to_string(),
                expected: "piccolo, medio, grande",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Moderate,
    Intricate,
}

impl Complexity {
    pub fn label(self) -> &'static str {
        match self {
            Complexity::Simple => "Semplice",
            Complexity::Moderate => "Moderata",
            Complexity::Intricate => "Intricata",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Complexity {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "semplice" | "simple" => Ok(Complexity::Simple),
            "moderata" | "moderate" => Ok(Complexity::Moderate),
            "intricata" | "intricate" => Ok(Complexity::Intricate),
            _ => Err(UnknownChoice {
                field: "complexity",
                value: value.to_string(),
                expected: "semplice, moderata, intricata",
            }),
        }
    }
}

/// A submitted tattoo description. Never mutated after submission; turns
/// keep their own clone so a bot message can be regenerated later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TattooRequest {
    pub subject: String,
    pub style: String,
    pub size: TattooSize,
    pub color: String,
    pub placement: String,
    pub elements: String,
    pub complexity: Complexity,
}

impl TattooRequest {
    pub fn elements(&self) -> Option<&str> {
        let trimmed = self.elements.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn to_partial(&self) -> PartialTattooRequest {
        PartialTattooRequest {
            subject: Some(self.subject.clone()),
            style: Some(self.style.clone()),
            size: Some(self.size),
            color: Some(self.color.clone()),
            placement: Some(self.placement.clone()),
            elements: self.elements().map(str::to_string),
            complexity: Some(self.complexity),
        }
    }
}

/// Whatever is known about an image being analysed; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialTattooRequest {
    pub subject: Option<String>,
    pub style: Option<String>,
    pub size: Option<TattooSize>,
    pub color: Option<String>,
    pub placement: Option<String>,
    pub elements: Option<String>,
    pub complexity: Option<Complexity>,
}

impl PartialTattooRequest {
    pub fn is_empty(&self) -> bool {
        *self == PartialTattooRequest::default()
    }
}
