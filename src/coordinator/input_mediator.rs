//! Out-of-band user input requests.
//!
//! At most one request is pending; a new request replaces it. Answers are
//! validated against the request before a submission is released.

use crate::domain::{
    CoordinatorError, InputAnswer, InputType, InputValidationError, RequestId, UserInputRequest,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInput {
    pub request: UserInputRequest,
    /// `None` only for number inputs that have no value yet.
    pub answer: Option<InputAnswer>,
}

#[derive(Debug, Default)]
pub struct UserInputMediator {
    pending: Option<PendingInput>,
}

impl UserInputMediator {
    /// Installs `request` as the pending one. Returns the id it replaced.
    pub fn receive(&mut self, request: UserInputRequest) -> Option<RequestId> {
        let answer = request.initial_answer();
        self.pending
            .replace(PendingInput { request, answer })
            .map(|old| old.request.request_id)
    }

    pub fn pending(&self) -> Option<&PendingInput> {
        self.pending.as_ref()
    }

    pub fn set_answer(&mut self, answer: InputAnswer) -> Result<(), CoordinatorError> {
        let pending = self
            .pending
            .as_mut()
            .ok_or(CoordinatorError::NoPendingInput)?;
        pending.answer = Some(answer);
        Ok(())
    }

    /// Validation result for the current buffer, `None` without a request.
    pub fn validation(&self) -> Option<Result<InputAnswer, InputValidationError>> {
        self.pending
            .as_ref()
            .map(|p| validate_answer(&p.request, p.answer.as_ref()))
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.validation(), Some(Ok(_)))
    }

    /// Validates and clears the pending request, returning what to send.
    pub fn take_submission(
        &mut self,
        request_id: &RequestId,
    ) -> Result<(RequestId, InputAnswer), CoordinatorError> {
        let pending = self.matching(request_id)?;
        let value = validate_answer(&pending.request, pending.answer.as_ref())?;
        let id = pending.request.request_id.clone();
        self.pending = None;
        Ok((id, value))
    }

    /// Clears the pending request without sending anything.
    pub fn cancel(&mut self, request_id: &RequestId) -> Result<UserInputRequest, CoordinatorError> {
        self.matching(request_id)?;
        self.pending
            .take()
            .map(|p| p.request)
            .ok_or(CoordinatorError::NoPendingInput)
    }

    fn matching(&self, request_id: &RequestId) -> Result<&PendingInput, CoordinatorError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(CoordinatorError::NoPendingInput)?;
        if &pending.request.request_id != request_id {
            return Err(CoordinatorError::RequestMismatch {
                requested: request_id.clone(),
                pending: pending.request.request_id.clone(),
            });
        }
        Ok(pending)
    }
}

/// Checks an answer against its request and returns the value to send.
///
/// Numeric text is coerced for number inputs; length bounds count
/// characters and apply to text and textarea only.
pub fn validate_answer(
    request: &UserInputRequest,
    answer: Option<&InputAnswer>,
) -> Result<InputAnswer, InputValidationError> {
    let answer = match answer {
        Some(answer) if !answer.is_blank() => answer,
        _ if request.required => return Err(InputValidationError::Required),
        _ => return Ok(InputAnswer::Text(String::new())),
    };

    match request.input_type {
        InputType::Number => match answer {
            InputAnswer::Number(n) if n.is_finite() => Ok(InputAnswer::Number(*n)),
            InputAnswer::Number(_) => Err(InputValidationError::NotANumber),
            InputAnswer::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(InputAnswer::Number)
                .ok_or(InputValidationError::NotANumber),
        },
        InputType::Text | InputType::Textarea => {
            let text = answer.to_string();
            check_length(request, &text)?;
            Ok(InputAnswer::Text(text))
        }
        InputType::Select => {
            let value = answer.to_string();
            if !request.options.is_empty() && !request.options.iter().any(|o| o.value == value) {
                return Err(InputValidationError::UnknownOption { value });
            }
            Ok(InputAnswer::Text(value))
        }
    }
}

fn check_length(request: &UserInputRequest, text: &str) -> Result<(), InputValidationError> {
    debug_assert!(request.input_type.is_free_text());
    let Some(validation) = request.validation else {
        return Ok(());
    };
    let actual = text.chars().count();
    if let Some(min) = validation.min_length {
        if actual < min {
            return Err(InputValidationError::TooShort { min, actual });
        }
    }
    if let Some(max) = validation.max_length {
        if actual > max {
            return Err(InputValidationError::TooLong { max, actual });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/input_mediator_tests.rs"]
mod tests;
