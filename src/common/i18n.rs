// src/common/i18n.rs
//
// Error messages shown to employees. English is the fallback language.

use crate::{
    common::{
        error::{format_conflicts, AppError, LeaveAction, LeaveRuleViolation, StateViolation},
        signature::SignatureError,
    },
    models::leave::LeaveStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Uk,
}

impl Lang {
    /// Primary subtag of a language tag: `uk-UA` -> Uk, anything unknown -> En.
    pub fn from_tag(tag: &str) -> Self {
        match tag.split('-').next().unwrap_or(tag).to_ascii_lowercase().as_str() {
            "uk" | "ua" => Lang::Uk,
            _ => Lang::En,
        }
    }
}

pub fn describe(lang: Lang, err: &AppError) -> String {
    match lang {
        Lang::En => describe_en(err),
        Lang::Uk => describe_uk(err),
    }
}

fn describe_en(err: &AppError) -> String {
    match err {
        AppError::ValidationError(_) => "One or more fields are invalid.".to_string(),
        AppError::LeaveRule(rule) => match rule {
            LeaveRuleViolation::UnknownLeaveType(_) => "The selected leave type does not exist.".to_string(),
            LeaveRuleViolation::LeafTypeRequired(title) => {
                format!("Leave type '{title}' has subtypes, please choose one of them.")
            }
            LeaveRuleViolation::EndNotAfterStart { .. } => {
                "End date must be later than the start date.".to_string()
            }
            LeaveRuleViolation::StartInPast { .. } => {
                "Start date cannot be earlier than the current date.".to_string()
            }
            LeaveRuleViolation::Overlap(conflicts) => format!(
                "There is an overlap with other leave requests for the selected dates: {}.",
                format_conflicts(conflicts)
            ),
        },
        AppError::InvalidState(StateViolation { action, .. }) => match action {
            LeaveAction::Update => "You can only edit leave requests with a saved status.".to_string(),
            LeaveAction::Delete => "You can only delete leave requests with a saved status.".to_string(),
            LeaveAction::Submit => "Only saved leave requests can be submitted for approval.".to_string(),
            LeaveAction::Decide => "Only pending leave requests can be approved or rejected.".to_string(),
        },
        AppError::EmptyRoster => "No employees are available for duty.".to_string(),
        AppError::NotFound(what) => format!("The requested {what} was not found."),
        AppError::LeaveTypeTitleTaken(title) => format!("Leave type '{title}' already exists."),
        AppError::UsernameTaken(username) => format!("Username '{username}' is already taken."),
        AppError::ChatIdentityTaken(_) => "This chat account is already linked to an employee.".to_string(),
        AppError::InvalidCredentials => "Invalid username or password.".to_string(),
        AppError::InvalidToken => "Authentication token is invalid or missing.".to_string(),
        AppError::Unauthenticated => "Please sign in to continue.".to_string(),
        AppError::Forbidden(permission) => {
            format!("You need the '{permission}' permission to perform this action.")
        }
        AppError::Signature(SignatureError::Expired) => {
            "The chat authorization has expired, please try again.".to_string()
        }
        AppError::Signature(_) => "The chat authorization could not be verified.".to_string(),
        _ => "An unexpected error occurred.".to_string(),
    }
}

fn describe_uk(err: &AppError) -> String {
    match err {
        AppError::ValidationError(_) => "Одне або кілька полів заповнено неправильно.".to_string(),
        AppError::LeaveRule(rule) => match rule {
            LeaveRuleViolation::UnknownLeaveType(_) => "Обраний тип відпустки не існує.".to_string(),
            LeaveRuleViolation::LeafTypeRequired(title) => {
                format!("Тип відпустки '{title}' має підтипи, оберіть один із них.")
            }
            LeaveRuleViolation::EndNotAfterStart { .. } => {
                "Дата завершення має бути пізнішою за дату початку.".to_string()
            }
            LeaveRuleViolation::StartInPast { .. } => {
                "Дата початку не може бути раніше поточної дати.".to_string()
            }
            LeaveRuleViolation::Overlap(conflicts) => format!(
                "Обрані дати перетинаються з іншими заявками: {}.",
                format_conflicts(conflicts)
            ),
        },
        AppError::InvalidState(StateViolation { action, status, .. }) => match action {
            LeaveAction::Update => "Редагувати можна лише збережені заявки.".to_string(),
            LeaveAction::Delete => "Видаляти можна лише збережені заявки.".to_string(),
            LeaveAction::Submit => "Надіслати на погодження можна лише збережену заявку.".to_string(),
            LeaveAction::Decide if *status == LeaveStatus::Approved => {
                "Заявку вже погоджено.".to_string()
            }
            LeaveAction::Decide => "Погодити або відхилити можна лише заявку, що очікує.".to_string(),
        },
        AppError::EmptyRoster => "Немає співробітників, доступних для чергування.".to_string(),
        AppError::NotFound(_) => "Запитаний запис не знайдено.".to_string(),
        AppError::LeaveTypeTitleTaken(title) => format!("Тип відпустки '{title}' вже існує."),
        AppError::UsernameTaken(username) => format!("Ім'я користувача '{username}' вже зайняте."),
        AppError::ChatIdentityTaken(_) => "Цей обліковий запис чату вже прив'язаний до співробітника.".to_string(),
        AppError::InvalidCredentials => "Неправильне ім'я користувача або пароль.".to_string(),
        AppError::InvalidToken => "Токен автентифікації недійсний або відсутній.".to_string(),
        AppError::Unauthenticated => "Увійдіть, щоб продовжити.".to_string(),
        AppError::Forbidden(permission) => {
            format!("Для цієї дії потрібен дозвіл '{permission}'.")
        }
        AppError::Signature(SignatureError::Expired) => {
            "Авторизація в чаті застаріла, спробуйте ще раз.".to_string()
        }
        AppError::Signature(_) => "Не вдалося перевірити авторизацію з чату.".to_string(),
        _ => "Сталася неочікувана помилка.".to_string(),
    }
}
