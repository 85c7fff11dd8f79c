// src/services/auth.rs

use std::collections::BTreeMap;

use bcrypt::verify;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::{
        error::AppError,
        signature::{self, SignatureError},
    },
    models::employee::{ChatProfile, Claims, Employee, NewEmployee},
    services::store::{LeaveStore, StoreTx},
};

const TOKEN_TTL_DAYS: i64 = 7;

// Fresh transactions to try before giving up on a contested username.
const USERNAME_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct AuthService<S> {
    store: S,
    jwt_secret: String,
    bot_token: String,
}

impl<S: LeaveStore> AuthService<S> {
    pub fn new(store: S, jwt_secret: String, bot_token: String) -> Self {
        Self {
            store,
            jwt_secret,
            bot_token,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        let mut tx = self.store.begin().await?;
        let employee = tx
            .employee_by_username(username)
            .await?
            .filter(|e| e.is_active)
            .ok_or(AppError::InvalidCredentials)?;
        tx.commit().await?;

        // Chat-only accounts have no password.
        let password_hash = employee.password_hash.clone().ok_or(AppError::InvalidCredentials)?;
        let password = password.to_owned();

        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(employee_id = employee.id, "Employee logged in");
        self.create_token(employee.id)
    }

    pub fn create_token(&self, employee_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: employee_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub async fn validate_token(&self, token: &str) -> Result<Employee, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let mut tx = self.store.begin().await?;
        let employee = tx.employee(token_data.claims.sub).await?;
        tx.commit().await?;

        employee.filter(|e| e.is_active).ok_or(AppError::InvalidToken)
    }

    /// Checks the bot signature and extracts the chat identity it vouches for.
    pub fn verify_chat_payload(
        &self,
        fields: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<ChatProfile, AppError> {
        signature::verify(fields, &self.bot_token, now)?;
        Ok(chat_profile(fields)?)
    }

    /// Active employee behind a signed chat payload, if any.
    pub async fn chat_employee(
        &self,
        fields: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Employee>, AppError> {
        let profile = self.verify_chat_payload(fields, now)?;
        let mut tx = self.store.begin().await?;
        let employee = tx.employee_by_telegram_id(profile.telegram_id).await?;
        tx.commit().await?;
        Ok(employee.filter(|e| e.is_active))
    }

    pub async fn is_employee(&self, fields: &BTreeMap<String, String>, now: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self.chat_employee(fields, now).await?.is_some())
    }

    /// Finds the employee linked to `profile` or onboards a new one.
    ///
    /// An existing employee gets empty names filled from the profile. A new
    /// one gets the profile's username, suffixed `_1`, `_2`, ... when taken.
    /// A concurrent insert of the same username is retried in a fresh
    /// transaction with the next suffix. A concurrent link of the same chat
    /// account is retried and resolves to the row the other link created.
    pub async fn link_chat_identity(&self, profile: &ChatProfile) -> Result<Employee, AppError> {
        let base = base_username(profile);
        let mut counter = 0;

        for _ in 0..USERNAME_ATTEMPTS {
            let mut tx = self.store.begin().await?;

            if let Some(existing) = tx.employee_by_telegram_id(profile.telegram_id).await? {
                let employee = fill_missing_names(&mut tx, existing, profile).await?;
                tx.commit().await?;
                tracing::info!(employee_id = employee.id, telegram_id = profile.telegram_id, "Chat identity matched");
                return Ok(employee);
            }

            let (username, used) = free_username(&mut tx, &base, counter).await?;
            let new = NewEmployee {
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                telegram_id: Some(profile.telegram_id),
                ..NewEmployee::active(username)
            };

            match tx.insert_employee(&new).await {
                Ok(employee) => {
                    tx.commit().await?;
                    tracing::info!(
                        employee_id = employee.id,
                        username = %employee.username,
                        telegram_id = profile.telegram_id,
                        "Employee created from chat identity"
                    );
                    return Ok(employee);
                }
                Err(AppError::UsernameTaken(taken)) => {
                    tracing::warn!(username = %taken, "Username claimed concurrently, retrying");
                    counter = used + 1;
                }
                // Linked concurrently; the next attempt finds the row.
                Err(AppError::ChatIdentityTaken(telegram_id)) => {
                    tracing::warn!(telegram_id, "Chat identity linked concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::UsernameTaken(base))
    }

    pub async fn has_permission(&self, employee_id: i64, permission: &str) -> Result<bool, AppError> {
        let mut tx = self.store.begin().await?;
        let allowed = tx.has_permission(employee_id, permission).await?;
        tx.commit().await?;
        Ok(allowed)
    }

    /// Acting employee of a request: a bearer token wins over a chat payload.
    ///
    /// A credential that is present but invalid is an error, not anonymity.
    pub async fn resolve(
        &self,
        bearer: Option<&str>,
        chat_fields: Option<&BTreeMap<String, String>>,
        now: DateTime<Utc>,
    ) -> Result<Option<Employee>, AppError> {
        if let Some(token) = bearer {
            return self.validate_token(token).await.map(Some);
        }
        match chat_fields {
            Some(fields) => self.chat_employee(fields, now).await,
            None => Ok(None),
        }
    }
}

pub const TELEGRAM_ID_FIELD: &str = "telegram_id";

// The login widget names the chat id `id`; the bot sends `telegram_id`.
fn chat_profile(fields: &BTreeMap<String, String>) -> Result<ChatProfile, SignatureError> {
    let raw = fields
        .get(TELEGRAM_ID_FIELD)
        .or_else(|| fields.get("id"))
        .ok_or(SignatureError::MissingField(TELEGRAM_ID_FIELD))?;
    let telegram_id = raw
        .parse()
        .map_err(|_| SignatureError::MalformedChatId(raw.clone()))?;

    let field = |name: &str| fields.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
    Ok(ChatProfile {
        telegram_id,
        username: field("username"),
        first_name: field("first_name"),
        last_name: field("last_name"),
    })
}

fn base_username(profile: &ChatProfile) -> String {
    if profile.username.is_empty() {
        format!("tg{}", profile.telegram_id)
    } else {
        profile.username.clone()
    }
}

async fn free_username<T: StoreTx>(tx: &mut T, base: &str, mut counter: usize) -> Result<(String, usize), AppError> {
    loop {
        let candidate = if counter == 0 {
            base.to_string()
        } else {
            format!("{base}_{counter}")
        };
        if tx.employee_by_username(&candidate).await?.is_none() {
            return Ok((candidate, counter));
        }
        counter += 1;
    }
}

async fn fill_missing_names<T: StoreTx>(
    tx: &mut T,
    employee: Employee,
    profile: &ChatProfile,
) -> Result<Employee, AppError> {
    if !employee.first_name.is_empty() && !employee.last_name.is_empty() {
        return Ok(employee);
    }
    let first_name = if employee.first_name.is_empty() {
        &profile.first_name
    } else {
        &employee.first_name
    };
    let last_name = if employee.last_name.is_empty() {
        &profile.last_name
    } else {
        &employee.last_name
    };
    tx.update_employee_names(employee.id, first_name, last_name).await
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;
    use crate::{
        common::signature::{sign, AUTH_DATE_FIELD, HASH_FIELD},
        db::MemoryStore,
    };

    const BOT_TOKEN: &str = "123456:test-bot";

    fn service(store: &MemoryStore) -> AuthService<MemoryStore> {
        AuthService::new(store.clone(), "jwt-test-secret".to_string(), BOT_TOKEN.to_string())
    }

    fn signed(pairs: &[(&str, &str)], issued_at: DateTime<Utc>) -> BTreeMap<String, String> {
        let mut fields: BTreeMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        fields.insert(AUTH_DATE_FIELD.to_string(), issued_at.timestamp().to_string());
        let hash = sign(&fields, BOT_TOKEN).unwrap();
        fields.insert(HASH_FIELD.to_string(), hash);
        fields
    }

    fn profile(telegram_id: i64, username: &str) -> ChatProfile {
        ChatProfile {
            telegram_id,
            username: username.to_string(),
            first_name: "Olena".to_string(),
            last_name: "Shevchenko".to_string(),
        }
    }

    #[tokio::test]
    async fn login_checks_the_password_hash() {
        let store = MemoryStore::new();
        store.add_employee(NewEmployee {
            password_hash: Some(bcrypt::hash("s3cret", 4).unwrap()),
            ..NewEmployee::active("olena")
        });
        store.add_employee(NewEmployee::active("chat-only"));
        let auth = service(&store);

        let token = auth.login("olena", "s3cret").await.unwrap();
        assert_eq!(auth.validate_token(&token).await.unwrap().username, "olena");

        assert_matches!(auth.login("olena", "wrong").await, Err(AppError::InvalidCredentials));
        assert_matches!(auth.login("chat-only", "").await, Err(AppError::InvalidCredentials));
        assert_matches!(auth.login("nobody", "x").await, Err(AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn tokens_of_inactive_employees_are_refused() {
        let store = MemoryStore::new();
        let former = store.add_employee(NewEmployee {
            is_active: false,
            ..NewEmployee::active("former")
        });
        let auth = service(&store);

        let token = auth.create_token(former.id).unwrap();
        assert_matches!(auth.validate_token(&token).await, Err(AppError::InvalidToken));
        assert_matches!(auth.validate_token("not-a-jwt").await, Err(AppError::InvalidToken));
    }

    #[tokio::test]
    async fn linking_creates_an_employee_with_a_unique_username() {
        let store = MemoryStore::new();
        store.add_employee(NewEmployee::active("olena"));
        store.add_employee(NewEmployee::active("olena_1"));
        let auth = service(&store);

        let linked = auth.link_chat_identity(&profile(4242, "olena")).await.unwrap();
        assert_eq!(linked.username, "olena_2");
        assert_eq!(linked.telegram_id, Some(4242));
        assert!(linked.is_active);

        let fallback = auth.link_chat_identity(&profile(77, "")).await.unwrap();
        assert_eq!(fallback.username, "tg77");
    }

    #[tokio::test]
    async fn linking_an_existing_identity_only_fills_empty_names() {
        let store = MemoryStore::new();
        let existing = store.add_employee(NewEmployee {
            first_name: "Olha".to_string(),
            telegram_id: Some(4242),
            ..NewEmployee::active("olha")
        });
        let auth = service(&store);

        let linked = auth.link_chat_identity(&profile(4242, "other")).await.unwrap();
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.username, "olha");
        assert_eq!(linked.first_name, "Olha");
        assert_eq!(linked.last_name, "Shevchenko");
        assert_eq!(store.snapshot().employees.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_link_of_the_same_account_resolves_to_the_existing_row() {
        let store = MemoryStore::new();
        let existing = store.add_employee(NewEmployee {
            telegram_id: Some(4242),
            ..NewEmployee::active("olena")
        });
        store.miss_next_chat_lookup();
        let auth = service(&store);

        let linked = auth.link_chat_identity(&profile(4242, "olena")).await.unwrap();
        assert_eq!(linked.id, existing.id);
        assert_eq!(store.snapshot().employees.len(), 1);
    }

    #[tokio::test]
    async fn chat_payload_identifies_the_employee() {
        let store = MemoryStore::new();
        let employee = store.add_employee(NewEmployee {
            telegram_id: Some(4242),
            ..NewEmployee::active("olena")
        });
        let auth = service(&store);
        let now = Utc::now();

        let known = signed(&[("telegram_id", "4242")], now);
        assert!(auth.is_employee(&known, now).await.unwrap());
        assert_eq!(auth.chat_employee(&known, now).await.unwrap().unwrap().id, employee.id);

        let stranger = signed(&[("id", "1")], now);
        assert!(!auth.is_employee(&stranger, now).await.unwrap());

        let stale = signed(&[("telegram_id", "4242")], now - Duration::hours(25));
        assert_matches!(
            auth.is_employee(&stale, now).await,
            Err(AppError::Signature(SignatureError::Expired))
        );

        let garbled = signed(&[("telegram_id", "abc")], now);
        assert_matches!(
            auth.verify_chat_payload(&garbled, now),
            Err(AppError::Signature(SignatureError::MalformedChatId(_)))
        );
    }

    #[tokio::test]
    async fn bearer_token_takes_precedence_over_chat_payload() {
        let store = MemoryStore::new();
        let web = store.add_employee(NewEmployee::active("web"));
        let chat = store.add_employee(NewEmployee {
            telegram_id: Some(4242),
            ..NewEmployee::active("chat")
        });
        let auth = service(&store);
        let now = Utc::now();
        let token = auth.create_token(web.id).unwrap();
        let fields = signed(&[("telegram_id", "4242")], now);

        let acting = auth.resolve(Some(&token), Some(&fields), now).await.unwrap();
        assert_eq!(acting.unwrap().id, web.id);

        let acting = auth.resolve(None, Some(&fields), now).await.unwrap();
        assert_eq!(acting.unwrap().id, chat.id);

        assert!(auth.resolve(None, None, now).await.unwrap().is_none());
        assert_matches!(
            auth.resolve(Some("garbage"), Some(&fields), now).await,
            Err(AppError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn group_members_hold_only_granted_permissions() {
        let store = MemoryStore::new();
        let manager = store.add_employee(NewEmployee::active("boss"));
        let plain = store.add_employee(NewEmployee::active("olena"));
        store.grant(manager.id, &["leave:decide"]);
        let auth = service(&store);

        assert!(auth.has_permission(manager.id, "leave:decide").await.unwrap());
        assert!(!auth.has_permission(manager.id, "period:reset").await.unwrap());
        assert!(!auth.has_permission(plain.id, "leave:decide").await.unwrap());
    }
}
