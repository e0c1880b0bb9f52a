use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of classes produced by the emotion classifier.
pub const EMOTION_COUNT: usize = 7;

/// Fixed emotion label set, in classifier output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// All labels, indexed by classifier output position.
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
            Emotion::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.label() == s)
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// Probability distribution over the fixed emotion label set.
///
/// Serializes as a JSON object keyed by label, in label order. Deserialization
/// requires exactly the seven labels, each with a probability in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionDistribution {
    probs: [f64; EMOTION_COUNT],
}

impl EmotionDistribution {
    /// Numerically stable softmax over raw classifier scores.
    ///
    /// The maximum score is subtracted before exponentiating, so the largest
    /// term is exactly `exp(0) = 1` and the normalizer is never zero.
    /// Callers must reject non-finite scores beforehand.
    pub fn softmax(scores: &[f32; EMOTION_COUNT]) -> Self {
        let max = scores
            .iter()
            .fold(f64::NEG_INFINITY, |m, &s| m.max(f64::from(s)));

        let mut probs = [0.0f64; EMOTION_COUNT];
        for (p, &s) in probs.iter_mut().zip(scores.iter()) {
            *p = (f64::from(s) - max).exp();
        }
        let sum: f64 = probs.iter().sum();
        for p in probs.iter_mut() {
            *p /= sum;
        }

        Self { probs }
    }

    /// Wrap already-normalized probabilities.
    pub fn from_probabilities(probs: [f64; EMOTION_COUNT]) -> Self {
        Self { probs }
    }

    pub fn probability(&self, emotion: Emotion) -> f64 {
        self.probs[emotion.index()]
    }

    pub fn as_array(&self) -> &[f64; EMOTION_COUNT] {
        &self.probs
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.probs[e.index()]))
    }

    /// Argmax label and its probability. The lowest index wins on ties.
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = Emotion::ALL[0];
        let mut best_p = self.probs[0];
        for (emotion, p) in self.iter().skip(1) {
            if p > best_p {
                best = emotion;
                best_p = p;
            }
        }
        (best, best_p)
    }
}

impl Serialize for EmotionDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EMOTION_COUNT))?;
        for (emotion, p) in self.iter() {
            map.serialize_entry(emotion.label(), &p)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EmotionDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = EmotionDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of the seven emotion labels to probabilities")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut probs: [Option<f64>; EMOTION_COUNT] = [None; EMOTION_COUNT];

                while let Some((key, value)) = access.next_entry::<String, f64>()? {
                    let emotion = Emotion::from_str(&key).map_err(de::Error::custom)?;
                    if !(0.0..=1.0).contains(&value) {
                        return Err(de::Error::custom(format!(
                            "probability for {key} out of range: {value}"
                        )));
                    }
                    let slot = &mut probs[emotion.index()];
                    if slot.is_some() {
                        return Err(de::Error::custom(format!("duplicate label: {key}")));
                    }
                    *slot = Some(value);
                }

                let mut out = [0.0f64; EMOTION_COUNT];
                for (i, p) in probs.iter().enumerate() {
                    out[i] = p.ok_or_else(|| de::Error::missing_field(Emotion::ALL[i].label()))?;
                }
                Ok(EmotionDistribution { probs: out })
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Packaged outcome of one emotion inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub dominant_emotion: Emotion,
    /// Percentage (0–100) of the dominant label's probability.
    pub confidence: f64,
    pub distribution: EmotionDistribution,
}

impl Prediction {
    /// Derive the dominant label and confidence from a distribution.
    pub fn from_distribution(distribution: EmotionDistribution) -> Self {
        let (dominant_emotion, p) = distribution.dominant();
        Self {
            dominant_emotion,
            confidence: p * 100.0,
            distribution,
        }
    }
}

/// Axis-aligned face bounding box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detector score (higher = more face-like).
    pub score: f64,
}

impl FaceBox {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}
