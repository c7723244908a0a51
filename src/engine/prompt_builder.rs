use crate::content::{ContentLibrary, QUESTIONS};
use crate::engine::narration::NarrationCue;
use crate::engine::plan::PlanSource;
use crate::model::evaluation::EvaluationRecord;
use crate::model::session::{CheckpointKind, Screen};

pub const SYSTEM_INSTRUCTION: &str = "Eres un terapeuta digital experto y compasivo llamado \"Asistente Mariposa\". \
Te especializas en el \"Método de Mariposa para la Transformación del Trauma\". \
Tu rol es ser el director inteligente de la sesión terapéutica.\n\n\
Tus responsabilidades principales son:\n\
1. Analizar Datos: Evaluar la información inicial del usuario para entender su herida y disparador.\n\
2. Crear Planes de Sanación: Diseñar una secuencia de protocolos de tapping personalizada y dinámica basada en el análisis. Justificarás brevemente el plan al usuario.\n\
3. Guiar Paso a Paso: Proporcionar instrucciones claras, contexto y aliento en cada etapa (Evaluación, Mapeo, Sesión, Resumen).\n\
4. Responder con Empatía: Contestar las preguntas del usuario manteniendo un tono compasivo, directo, validador y empoderador. Mantén el contexto de la sesión.\n\
5. Mantener la Seguridad: Si el usuario expresa angustia severa (ideación suicida), prioriza su seguridad indicándole que contacte servicios de emergencia de inmediato.\n\n\
Mantén tus respuestas concisas y enfocadas en el proceso terapéutico. NO proporciones consejos médicos. \
Recibirás indicaciones programáticas sobre el progreso del usuario y el contexto de la sesión para guiar tus respuestas.";

/// Formats the text sent to the assistant. Only builds strings.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn plan_request(record: &EvaluationRecord) -> String {
        let mut prompt = String::new();

        prompt.push_str("Un usuario ha completado su evaluación. Sus datos son: ");
        prompt.push_str(&record.to_json());
        prompt.push_str(".\n");
        prompt.push_str(
            "Actuando como un experto en el Método Mariposa, crea una secuencia de protocolos de sanación personalizada para este usuario.\n",
        );
        prompt.push_str(&format!(
            "Considera su emoción principal ('{}') y su creencia negativa ('{}') para determinar si se necesita un protocolo 'G' específico (ej. 'G3' para vacío, 'G4' para desolación).\n",
            record.emotion.label(),
            record.negative_belief
        ));
        prompt.push_str(
            "Devuelve SÓLO un array JSON con las claves de los protocolos en el orden recomendado. \
Ejemplo de respuesta: [\"A\", \"B\", \"G3\", \"C\", \"D\", \"E\", \"F\", \"H\"]",
        );

        prompt
    }

    /// Prompt for a narration cue, or `None` when the cue has nothing to say
    /// (an unknown protocol, a step outside the questionnaire).
    pub fn for_cue(cue: &NarrationCue, library: &ContentLibrary) -> Option<String> {
        match cue {
            NarrationCue::Screen { screen, payload } => Some(screen_prompt(*screen, payload.as_deref())),
            NarrationCue::EvaluationStep(step) => {
                let question = QUESTIONS.get(*step)?;
                Some(format!(
                    "Estoy en el paso {} de la evaluación: \"{}\". Explica brevemente el propósito de esta pregunta.",
                    step + 1,
                    question.label
                ))
            }
            NarrationCue::ProtocolEntered(id) => {
                let protocol = library.resolve(id)?;
                Some(format!(
                    "Voy a comenzar el Protocolo {}: {}. Explica brevemente su propósito: \"{}\"",
                    id, protocol.name, protocol.description
                ))
            }
            NarrationCue::Checkpoint(kind) => Some(checkpoint_prompt(*kind).to_string()),
            NarrationCue::PlanReady { source, emotion } => Some(match source {
                PlanSource::Personalized => format!(
                    "He creado un plan personalizado para ti basado en lo que compartiste. \
Nos enfocaremos en validar tus sentimientos, conectar con la herida original, separar el pasado del presente y fortalecer tu identidad adulta. \
He incluido pasos específicos para abordar la emoción de '{emotion}'."
                ),
                PlanSource::Fallback => "No pude crear un plan personalizado en este momento. \
Seguiremos una secuencia estándar de sanación que es muy efectiva."
                    .to_string(),
            }),
            NarrationCue::UserMessage(text) => Some(text.clone()),
        }
    }
}

fn screen_prompt(screen: Screen, payload: Option<&str>) -> String {
    let payload = payload.unwrap_or("{}");
    match screen {
        Screen::Welcome => "Acabo de abrir la aplicación. Dame una cálida bienvenida, preséntate y explica brevemente tu propósito. Anímame a comenzar.".to_string(),
        Screen::Evaluation => "He comenzado la evaluación. Explica que estas preguntas son para entender la conexión entre mis sentimientos y mis experiencias pasadas. Anímame a ser honesto.".to_string(),
        Screen::Mapping => format!(
            "He finalizado la evaluación y estoy en la pantalla de mapeo. Mis datos son: {payload}. \
Explica cómo mi situación actual es un 'espejo' de mi herida original. Valida mis sentimientos."
        ),
        Screen::Session => "Estoy a punto de comenzar la sesión de tapping. Explica el proceso brevemente (brazos cruzados, golpecitos, frases) y asegúrame que me guiarás.".to_string(),
        Screen::Summary => format!(
            "He completado la sesión. Mi informe de progreso es: {payload}. \
Felicítame por el trabajo. Explica brevemente el significado de los cambios en SUDS y VoC."
        ),
    }
}

fn checkpoint_prompt(kind: CheckpointKind) -> &'static str {
    match kind {
        CheckpointKind::Intensity => "Estoy en un punto de control de SUDS. Explica que es un momento para verificar mi intensidad emocional y ver el progreso.",
        CheckpointKind::Validity => "Estoy en el punto de control de VoC. Explica que necesito calificar cuán verdadera se siente la cognición positiva, midiendo el cambio en mis creencias.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::evaluation::Emotion;

    #[test]
    fn step_prompt_is_one_based() {
        let prompt = PromptBuilder::for_cue(&NarrationCue::EvaluationStep(0), ContentLibrary::standard()).unwrap();
        assert!(prompt.starts_with("Estoy en el paso 1 de la evaluación"));
        assert!(prompt.contains(QUESTIONS[0].label));
        assert!(PromptBuilder::for_cue(&NarrationCue::EvaluationStep(8), ContentLibrary::standard()).is_none());
    }

    #[test]
    fn protocol_prompt_names_the_protocol() {
        let library = ContentLibrary::standard();
        let prompt = PromptBuilder::for_cue(&NarrationCue::ProtocolEntered("C".into()), library).unwrap();
        assert!(prompt.contains("Protocolo C: PROTOCOLO C: DIFERENCIACIÓN TEMPORAL"));
        assert!(PromptBuilder::for_cue(&NarrationCue::ProtocolEntered("Z".into()), library).is_none());
    }

    #[test]
    fn summary_prompt_embeds_payload() {
        let cue = NarrationCue::Screen {
            screen: Screen::Summary,
            payload: Some("{\"sudsStart\":8}".into()),
        };
        let prompt = PromptBuilder::for_cue(&cue, ContentLibrary::standard()).unwrap();
        assert!(prompt.contains("{\"sudsStart\":8}"));
    }

    #[test]
    fn plan_announcement_mentions_emotion() {
        let cue = NarrationCue::PlanReady {
            source: PlanSource::Personalized,
            emotion: Emotion::Culpa.label().to_string(),
        };
        let prompt = PromptBuilder::for_cue(&cue, ContentLibrary::standard()).unwrap();
        assert!(prompt.contains("'Culpa'"));
    }
}
