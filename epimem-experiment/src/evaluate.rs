use epimem_core::{Response, ResponseCategory, TaskKind, TaskPayload};

/// Outcome of scoring one response against its task
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// `None` when the task has no correct answer or the token is not one of its choices
    pub correct: Option<bool>,
    pub category: ResponseCategory,
    pub expected: Option<String>,
    /// Absolute rank error, room-order tasks only
    pub error_distance: Option<u32>,
}

/// Categories reported for a kind, in report order
pub fn categories(kind: TaskKind) -> &'static [ResponseCategory] {
    use ResponseCategory::*;
    match kind {
        TaskKind::ObjectRecognition => &[
            Hit,
            Miss,
            FalseAlarm,
            CorrectRejection,
            Other,
            DontKnow,
            NoResponse,
        ],
        TaskKind::RoomLocate => &[
            CorrectRoom,
            WrongRoom,
            NoCorrectAnswer,
            DontKnow,
            NoResponse,
        ],
        TaskKind::SpatialPosition => &[
            CorrectPosition,
            WrongPosition,
            NoCorrectAnswer,
            DontKnow,
            NoResponse,
        ],
        TaskKind::DayNight => &[
            CorrectTime,
            WrongTime,
            NoCorrectAnswer,
            DontKnow,
            NoResponse,
        ],
        TaskKind::RoomOrder => &[
            CorrectOrder,
            WrongOrder,
            NoCorrectAnswer,
            DontKnow,
            NoResponse,
        ],
        TaskKind::ScenePlausibility | TaskKind::ScenePlausibilityImmediate => {
            &[CorrectScene, WrongScene, DontKnow, NoResponse]
        }
    }
}

pub fn evaluate(payload: &TaskPayload, response: &Response) -> Evaluation {
    let expected = payload.expected_answer();
    let has_answer = expected.is_some();

    let correct = match (response.choice(), has_answer) {
        (_, false) => None,
        (None, true) => Some(false),
        (Some(choice), true) => choice_correctness(payload, choice, expected.as_deref()),
    };

    let error_distance = match payload {
        TaskPayload::RoomOrder {
            correct_order: Some(rank),
            ..
        } => ordinal(response).map(|given| given.abs_diff(*rank)),
        _ => None,
    };

    let category = match response {
        Response::DontKnow => ResponseCategory::DontKnow,
        Response::NoResponse => ResponseCategory::NoResponse,
        Response::Choice(choice) => choice_category(payload, choice, has_answer, correct),
    };

    Evaluation {
        correct,
        category,
        expected,
        error_distance,
    }
}

fn ordinal(response: &Response) -> Option<u32> {
    response.choice()?.trim().parse().ok()
}

fn choice_correctness(payload: &TaskPayload, choice: &str, expected: Option<&str>) -> Option<bool> {
    match payload {
        TaskPayload::ObjectRecognition { object } => match choice {
            "yes" => Some(object.is_familiar),
            "no" => Some(!object.is_familiar),
            _ => None,
        },
        TaskPayload::RoomLocate { .. }
        | TaskPayload::SpatialPosition { .. }
        | TaskPayload::DayNight { .. } => Some(Some(choice) == expected),
        TaskPayload::RoomOrder { correct_order, .. } => {
            Some(choice.trim().parse::<u32>().ok() == *correct_order)
        }
        TaskPayload::ScenePlausibility { is_correct, .. }
        | TaskPayload::ScenePlausibilityImmediate { is_correct, .. } => match choice {
            "correct" => Some(*is_correct),
            "incorrect" => Some(!*is_correct),
            _ => None,
        },
    }
}

fn choice_category(
    payload: &TaskPayload,
    choice: &str,
    has_answer: bool,
    correct: Option<bool>,
) -> ResponseCategory {
    use ResponseCategory::*;
    let right = correct == Some(true);
    let pick = |good, bad| if right { good } else { bad };
    match payload {
        TaskPayload::ObjectRecognition { object } => match (choice, object.is_familiar) {
            ("yes", true) => Hit,
            ("yes", false) => FalseAlarm,
            ("no", true) => Miss,
            ("no", false) => CorrectRejection,
            _ => Other,
        },
        _ if !has_answer => NoCorrectAnswer,
        TaskPayload::RoomLocate { .. } => pick(CorrectRoom, WrongRoom),
        TaskPayload::SpatialPosition { .. } => pick(CorrectPosition, WrongPosition),
        TaskPayload::DayNight { .. } => pick(CorrectTime, WrongTime),
        TaskPayload::RoomOrder { .. } => pick(CorrectOrder, WrongOrder),
        TaskPayload::ScenePlausibility { .. } | TaskPayload::ScenePlausibilityImmediate { .. } => {
            pick(CorrectScene, WrongScene)
        }
    }
}
