use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pacing/visual flavour of a protocol. Has no effect on sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolCategory {
    #[default]
    Normal,
    /// Slow, soothing delivery.
    Arrullo,
    /// Firm, assertive delivery.
    Firme,
    /// Short symptom-relief scripts.
    Rapido,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubProtocol {
    pub name: String,
    pub taps: u32,
    pub template: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub name: String,
    pub taps: u32,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default, rename = "type")]
    pub category: ProtocolCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "subProtocols", skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_protocols: BTreeMap<String, SubProtocol>,
}

/// A protocol or sub-protocol resolved into something the playback engine can walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayableProtocol {
    pub id: String,
    pub name: String,
    pub taps: u32,
    pub category: ProtocolCategory,
    pub description: String,
    pub phrases: Vec<String>,
}

/// Ordered, non-empty list of protocol identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PlanSequence(Vec<String>);

impl PlanSequence {
    pub fn new(ids: Vec<String>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self(ids))
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for PlanSequence {
    type Error = &'static str;

    fn try_from(ids: Vec<String>) -> Result<Self, Self::Error> {
        PlanSequence::new(ids).ok_or("plan must contain at least one protocol")
    }
}

impl From<PlanSequence> for Vec<String> {
    fn from(plan: PlanSequence) -> Self {
        plan.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plans_cannot_be_built() {
        assert!(PlanSequence::new(Vec::new()).is_none());
        assert!(serde_json::from_str::<PlanSequence>("[]").is_err());

        let plan: PlanSequence = serde_json::from_str(r#"["A","H"]"#).unwrap();
        assert_eq!(plan.ids(), ["A", "H"]);
    }

    #[test]
    fn protocol_reads_library_schema() {
        let json = r#"{
            "name": "PROTOCOLO X",
            "taps": 12,
            "type": "arrullo",
            "phrases": ["uno", "dos"]
        }"#;
        let protocol: Protocol = serde_json::from_str(json).unwrap();
        assert_eq!(protocol.category, ProtocolCategory::Arrullo);
        assert!(protocol.sub_protocols.is_empty());
        assert_eq!(protocol.description, "");
    }
}
