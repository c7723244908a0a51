//! Content library
//!
//! The fixed table of tapping protocols, the default plan, the two checkpoint
//! protocols and the intake questionnaire. Everything here is read-only data.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::LibraryError;
use crate::model::evaluation::{IntakeField, SUDS_MAX, SUDS_MIN};
use crate::model::protocol::{PlayableProtocol, PlanSequence, Protocol, ProtocolCategory, SubProtocol};

/// Sequence used whenever a personalized plan is not available.
pub const DEFAULT_SEQUENCE: [&str; 7] = ["A", "B", "C", "D", "E", "F", "H"];

/// Protocol after which the intensity (SUDS) checkpoint opens.
pub const TEMPORAL_DIFFERENTIATION: &str = "C";

/// Protocol after which the validity (VoC) checkpoint opens.
pub const ADULT_IDENTITY: &str = "F";

/// Sub-protocol shown as the crisis quick card on the summary.
pub const CRISIS_SUB_PROTOCOL: (&str, &str) = ("G", "G4");

pub fn default_plan() -> PlanSequence {
    PlanSequence::new(DEFAULT_SEQUENCE.iter().map(|id| id.to_string()).collect())
        .unwrap_or_else(|| unreachable!("default sequence is a non-empty constant"))
}

/* =========================
   Library
   ========================= */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentLibrary {
    protocols: BTreeMap<String, Protocol>,
}

impl ContentLibrary {
    /// The built-in library, built once per process.
    pub fn standard() -> &'static ContentLibrary {
        static LIBRARY: OnceLock<ContentLibrary> = OnceLock::new();
        LIBRARY.get_or_init(build_standard)
    }

    pub fn from_json(json: &str) -> Result<Self, LibraryError> {
        let library: ContentLibrary = serde_json::from_str(json)?;
        if library.protocols.is_empty() {
            return Err(LibraryError::Empty);
        }
        // The fallback plan and both checkpoints must play against any library.
        if let Some(id) = DEFAULT_SEQUENCE.iter().find(|id| !library.is_playable(id)) {
            return Err(LibraryError::MissingDefault(id.to_string()));
        }
        Ok(library)
    }

    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &str) -> Option<&Protocol> {
        self.protocols.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    pub fn sub_protocol(&self, parent: &str, id: &str) -> Option<&SubProtocol> {
        self.protocols.get(parent)?.sub_protocols.get(id)
    }

    /// Resolves an identifier to a walkable phrase list.
    ///
    /// Top-level protocols resolve when they carry phrases of their own.
    /// Sub-protocol identifiers resolve through their parent, inheriting its
    /// category and description. Containers without phrases do not resolve.
    pub fn resolve(&self, id: &str) -> Option<PlayableProtocol> {
        if let Some(protocol) = self.protocols.get(id) {
            if protocol.phrases.is_empty() {
                return None;
            }
            return Some(PlayableProtocol {
                id: id.to_string(),
                name: protocol.name.clone(),
                taps: protocol.taps,
                category: protocol.category,
                description: protocol.description.clone(),
                phrases: protocol.phrases.clone(),
            });
        }

        self.protocols.values().find_map(|parent| {
            let sub = parent.sub_protocols.get(id)?;
            if sub.template.is_empty() {
                return None;
            }
            Some(PlayableProtocol {
                id: id.to_string(),
                name: sub.name.clone(),
                taps: sub.taps,
                category: parent.category,
                description: parent.description.clone(),
                phrases: sub.template.clone(),
            })
        })
    }

    pub fn is_playable(&self, id: &str) -> bool {
        self.resolve(id).is_some()
    }
}

fn protocol(
    name: &str,
    taps: u32,
    category: ProtocolCategory,
    description: &str,
    phrases: &[&str],
) -> Protocol {
    Protocol {
        name: name.to_string(),
        taps,
        phrases: phrases.iter().map(|p| p.to_string()).collect(),
        category,
        description: description.to_string(),
        sub_protocols: BTreeMap::new(),
    }
}

fn sub_protocol(name: &str, taps: u32, template: &[&str]) -> SubProtocol {
    SubProtocol {
        name: name.to_string(),
        taps,
        template: template.iter().map(|p| p.to_string()).collect(),
    }
}

fn build_standard() -> ContentLibrary {
    use ProtocolCategory::*;

    let mut protocols = BTreeMap::new();

    protocols.insert(
        "A".to_string(),
        protocol(
            "PROTOCOLO A: RECONOCIMIENTO Y VALIDACIÓN",
            25,
            Normal,
            "Para iniciar cualquier sesión y validar tu experiencia emocional.",
            &[
                "`[emotion]` que siento es real y válida",
                "Tengo permiso de sentir lo que siento con `[involved]`",
                "No estoy exagerando, estoy procesando",
                "Mi experiencia tiene sentido dada mi historia",
                "`[situation]` tocó algo profundo en mí",
                "Este dolor es información, no debilidad",
            ],
        ),
    );

    protocols.insert(
        "B".to_string(),
        protocol(
            "PROTOCOLO B: CONTACTO CON HERIDA ORIGINAL",
            35,
            Arrullo,
            "Para conectar de forma segura con la memoria original de la herida.",
            &[
                "Ese niño/a que sintió `[negativeBelief]` por primera vez, fui yo",
                "Esa experiencia con `[firstInvolved]` fue real",
                "Ese dolor es profundo y legítimo",
                "Ese niño/a necesitaba `[necesidad_no_cumplida]`",
                "Y no la recibió de `[firstInvolved]`",
                "Esa herida quedó sin sanar por mucho tiempo",
                "Y sigue apareciendo cuando `[situation]`",
            ],
        ),
    );

    protocols.insert(
        "C".to_string(),
        protocol(
            "PROTOCOLO C: DIFERENCIACIÓN TEMPORAL",
            40,
            Firme,
            "Para separar el pasado del presente y reconocer tus recursos actuales.",
            &[
                "Eso pasó ENTONCES, no está pasando exactamente así ahora",
                "Ese niño/a vulnerable vivió eso, el adulto que soy hoy tiene recursos",
                "El pasado es pasado, el presente es diferente",
                "Aquella situación con `[firstInvolved]` terminó",
                "Hoy es `[fecha_actual]`, tengo `[edad_actual]` años",
                "No soy indefenso, soy capaz y resiliente",
                "Entonces no tenía opciones, ahora SÍ tengo opciones",
                "La herida es antigua, mi capacidad es presente",
            ],
        ),
    );

    protocols.insert(
        "D".to_string(),
        protocol(
            "PROTOCOLO D: DIFERENCIACIÓN DE PERSONAS",
            45,
            Firme,
            "Para separar a la figura original de la herida de la persona o situación actual.",
            &[
                "`[firstInvolved]` es `[firstInvolved]`",
                "Él/Ella/Esa situación tuvo sus propias limitaciones",
                "Su acción fue SUYA, no sobre mi valor",
                "Ya no necesito su validación para tener valor",
                "Lo/La coloco en el pasado, donde pertenece",
                "`[involved]` NO es `[firstInvolved]`",
                "`[involved]` es solo una persona/situación en mi presente",
                "Su comportamiento es suyo, no un veredicto sobre mí",
                "Puedo manejar esta situación sin que signifique que soy `[negativeBelief]`",
            ],
        ),
    );

    protocols.insert(
        "E".to_string(),
        protocol(
            "PROTOCOLO E: RESCATE DEL YO INTERIOR",
            50,
            Arrullo,
            "Para sanar y proteger a tu parte herida desde tu fortaleza adulta.",
            &[
                "Ese niño/a herido está aquí conmigo",
                "Lo/La veo, lo/la reconozco, lo/la valido",
                "Pero YO no soy solo ese niño/a",
                "Esa parte herida es UNA parte de mí, no TODO yo",
                "Yo crecí, me desarrollé, me fortalecí",
                "Puedo sostener a mi niño/a interior sin SER él/ella",
                "Él/Ella siente `[emotion]`, yo como adulto tengo recursos",
                "Lo/La sostengo con amor, pero no dejo que dirija mi vida adulta",
                "Le doy un lugar seguro dentro de mí",
                "Y desde mi fuerza adulta, me protejo y elijo mi bienestar",
            ],
        ),
    );

    protocols.insert(
        "F".to_string(),
        protocol(
            "PROTOCOLO F: INSTALACIÓN DE IDENTIDAD ADULTA",
            50,
            Firme,
            "Para fortalecer y anclar tus recursos y tu identidad presente.",
            &[
                "SOY `[nombre]`, un adulto en el presente",
                "TENGO sabiduría, experiencia, y resiliencia",
                "PUEDO elegir, establecer límites y cuidarme",
                "MEREZCO paz, respeto y amor recíproco",
                "MI VALOR es intrínseco e innegociable",
                "ELIJO mi bienestar por encima de patrones antiguos",
                "DECIDO actuar basado en mi sabiduría adulta",
                "CONFÍO en mi capacidad para manejar `[situation]`",
                "SOY CAPAZ de construir un futuro sano",
                "Siento como `[positiveCognition]` es cada vez más verdad.",
            ],
        ),
    );

    let mut symptoms = protocol(
        "PROTOCOLO G: MANEJO DE SÍNTOMAS ESPECÍFICOS",
        30,
        Rapido,
        "Técnicas rápidas para manejar pensamientos o sensaciones intensas.",
        &[],
    );
    symptoms.sub_protocols.insert(
        "G1".to_string(),
        sub_protocol(
            "Para Pensamientos Obsesivos",
            30,
            &[
                "ALTO. Reconozco este bucle mental sobre `[situation]`",
                "Esto es mi mente evitando sentir `[emotion]`",
                "Este pensamiento es una historia, no un hecho",
                "Elijo enfocarme en mi respiración, aquí y ahora",
            ],
        ),
    );
    symptoms.sub_protocols.insert(
        "G3".to_string(),
        sub_protocol(
            "Para Sensación de Vacío",
            40,
            &[
                "Este vacío NO lo creó `[involved]`",
                "Este vacío ya estaba desde la herida con `[firstInvolved]`",
                "No necesito nada externo para llenar este espacio",
                "YO lleno este vacío con mi propia presencia y amor",
            ],
        ),
    );
    symptoms.sub_protocols.insert(
        "G4".to_string(),
        sub_protocol(
            "Para Desolación Aguda",
            40,
            &[
                "La desolación está aquí, la siento en `[bodyLocation]`",
                "Esta es la herida antigua activada por `[situation]`",
                "No es una emergencia, es una emoción intensa",
                "Mi yo adulto sostiene a mi parte herida ahora",
                "Esta desolación pasará, yo permanezco",
            ],
        ),
    );
    protocols.insert("G".to_string(), symptoms);

    protocols.insert(
        "H".to_string(),
        protocol(
            "PROTOCOLO H: CIERRE E INTEGRACIÓN",
            35,
            Normal,
            "Para finalizar la sesión, integrando los cambios y aprendizajes.",
            &[
                "La herida con `[firstInvolved]` es pasado",
                "`[situation]` es presente, y tengo recursos para manejarla",
                "Mi parte herida está segura y protegida por mí",
                "YO SOY el adulto capaz que soy hoy",
                "Camino hacia adelante con más claridad y fuerza",
                "Mi historia me formó, pero no me define",
                "Llevo mi herida sanada como fuente de sabiduría",
                "Construyo mi futuro desde mi fortaleza presente",
            ],
        ),
    );

    ContentLibrary { protocols }
}

/* =========================
   Intake Questions
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Text,
    EmotionSelect,
    Slider { min: u8, max: u8 },
}

#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub field: IntakeField,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub kind: QuestionKind,
}

pub const QUESTIONS: [Question; 8] = [
    Question {
        field: IntakeField::Situation,
        label: "¿Qué situación actual te está generando malestar?",
        placeholder: "Ej: Una discusión con mi pareja, una crítica en el trabajo...",
        kind: QuestionKind::Text,
    },
    Question {
        field: IntakeField::Involved,
        label: "¿Quién o qué está involucrado en esta situación?",
        placeholder: "Ej: Mi jefe, mi hermana, una decisión importante...",
        kind: QuestionKind::Text,
    },
    Question {
        field: IntakeField::Emotion,
        label: "¿Qué emoción principal estás sintiendo?",
        placeholder: "Selecciona una emoción...",
        kind: QuestionKind::EmotionSelect,
    },
    Question {
        field: IntakeField::BodyLocation,
        label: "¿Dónde sientes esta emoción en tu cuerpo?",
        placeholder: "Ej: En el pecho, un nudo en la garganta...",
        kind: QuestionKind::Text,
    },
    Question {
        field: IntakeField::Suds,
        label: "En una escala de 0 a 10, ¿qué tan intensa es esa emoción?",
        placeholder: "",
        kind: QuestionKind::Slider {
            min: SUDS_MIN,
            max: SUDS_MAX,
        },
    },
    Question {
        field: IntakeField::FirstTime,
        label: "¿Cuándo fue la primera vez que sentiste algo similar en tu vida?",
        placeholder: "Ej: En la infancia, con mis padres, en la escuela...",
        kind: QuestionKind::Text,
    },
    Question {
        field: IntakeField::FirstInvolved,
        label: "¿Quién estaba involucrado en esa primera experiencia?",
        placeholder: "Ej: Mi madre, mi padre, un profesor...",
        kind: QuestionKind::Text,
    },
    Question {
        field: IntakeField::NegativeBelief,
        label: "¿Qué creencia negativa se formó entonces sobre ti?",
        placeholder: "Ej: \"No soy suficiente\", \"No merezco amor\", \"Soy defectuoso\"...",
        kind: QuestionKind::Text,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_is_fully_playable() {
        let library = ContentLibrary::standard();
        for id in DEFAULT_SEQUENCE {
            assert!(library.is_playable(id), "{id} should be playable");
        }
        assert_eq!(default_plan().len(), 7);
    }

    #[test]
    fn sub_protocols_resolve_through_their_parent() {
        let library = ContentLibrary::standard();
        let g3 = library.resolve("G3").unwrap();
        assert_eq!(g3.name, "Para Sensación de Vacío");
        assert_eq!(g3.taps, 40);
        assert_eq!(g3.category, ProtocolCategory::Rapido);
        assert_eq!(g3.phrases.len(), 4);
    }

    #[test]
    fn phraseless_container_is_not_playable() {
        let library = ContentLibrary::standard();
        assert!(library.get("G").is_some());
        assert!(!library.is_playable("G"));
        assert!(!library.is_playable("Z"));
    }

    #[test]
    fn external_library_round_trips_through_json() {
        let json = serde_json::to_string(ContentLibrary::standard()).unwrap();
        let loaded = ContentLibrary::from_json(&json).unwrap();
        assert_eq!(&loaded, ContentLibrary::standard());
        assert!(loaded.sub_protocol("G", "G4").is_some());
    }

    #[test]
    fn empty_external_library_is_rejected() {
        assert!(matches!(
            ContentLibrary::from_json("{}"),
            Err(LibraryError::Empty)
        ));
    }

    #[test]
    fn library_without_default_protocols_is_rejected() {
        let mut partial = ContentLibrary::standard().clone();
        partial.protocols.retain(|id, _| id == "A" || id == "H");
        let json = serde_json::to_string(&partial).unwrap();
        assert!(matches!(
            ContentLibrary::from_json(&json),
            Err(LibraryError::MissingDefault(id)) if id == "B"
        ));

        let mut phraseless = ContentLibrary::standard().clone();
        phraseless.protocols.get_mut(TEMPORAL_DIFFERENTIATION).unwrap().phrases.clear();
        let json = serde_json::to_string(&phraseless).unwrap();
        assert!(matches!(
            ContentLibrary::from_json(&json),
            Err(LibraryError::MissingDefault(id)) if id == TEMPORAL_DIFFERENTIATION
        ));
    }

    #[test]
    fn questionnaire_follows_field_order() {
        let fields: Vec<_> = QUESTIONS.iter().map(|q| q.field).collect();
        assert_eq!(fields[0], IntakeField::Situation);
        assert_eq!(fields[2], IntakeField::Emotion);
        assert_eq!(fields[4], IntakeField::Suds);
        assert_eq!(fields[7], IntakeField::NegativeBelief);
    }
}
