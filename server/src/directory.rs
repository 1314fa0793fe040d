//! Organizer onboarding and authentication.
//!
//! An organizer registers (status `pending`), an admin approves the account
//! (`pending -> approved`, terminal), and only then may the organizer log in.
//! The store enforces email uniqueness and the conditional status update; the
//! directory only translates its conflict signals into stable messages.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::auth::{CredentialHasher, TokenIssuer};
use crate::models::{
    LoginRequest, LoginResponse, NewOrganizer, Organizer, OrganizerResponse, OrganizerStatus,
    RegisterRequest,
};
use crate::notify::Notifier;
use crate::store::{OrganizerStore, StoreError};
use crate::utils::error::AppError;

pub const REGISTER_FIELDS_REQUIRED: &str =
    "First name, last name, email and password are required";
pub const LOGIN_FIELDS_REQUIRED: &str = "Email and password are required";
pub const EMAIL_ALREADY_REGISTERED: &str = "Email already registered";
/// Shared by unknown email and wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_NOT_APPROVED: &str = "Account not approved";
pub const ORGANIZER_NOT_FOUND: &str = "Organizer not found";
pub const ORGANIZER_ALREADY_APPROVED: &str = "Organizer already approved";

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Recipient of approval requests; `None` skips the email.
    pub admin_email: Option<String>,
    /// Prefix of the approval deep link, e.g. `https://desk.example.com/api`.
    pub approval_base_url: String,
    /// Lifetime of the signed token embedded in the approval link.
    pub approval_link_ttl: chrono::Duration,
    /// Overall budget for one register/login/approve call.
    pub operation_timeout: Duration,
}

pub struct OrganizerDirectory {
    store: Arc<dyn OrganizerStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<TokenIssuer>,
    notifier: Arc<dyn Notifier>,
    config: DirectoryConfig,
}

struct Registration {
    fname: String,
    lname: String,
    email: String,
    password: String,
    contact_no: Option<String>,
}

impl OrganizerDirectory {
    pub fn new(
        store: Arc<dyn OrganizerStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<TokenIssuer>,
        notifier: Arc<dyn Notifier>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            notifier,
            config,
        }
    }

    /// Deep link for the admin email. The query token alone authorizes
    /// approving this one organizer, so following the link is enough.
    pub fn approval_link(&self, organizer_id: i64) -> Result<String, AppError> {
        let token = self
            .tokens
            .issue_approval(organizer_id, self.config.approval_link_ttl)?;
        Ok(format!(
            "{}/organizers/{}/approve?token={}",
            self.config.approval_base_url.trim_end_matches('/'),
            organizer_id,
            token
        ))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<OrganizerResponse, AppError> {
        let deadline = self.deadline();
        let input = validate_registration(request)?;

        let organizer = within(deadline, "register", async move {
            if self.store.find_by_email(&input.email).await?.is_some() {
                return Err(AppError::Conflict(EMAIL_ALREADY_REGISTERED.to_string()));
            }

            let password_hash = self.hash_password(input.password).await?;
            let record = NewOrganizer {
                name: format!("{} {}", input.fname, input.lname),
                fname: input.fname,
                lname: input.lname,
                email: input.email,
                contact_no: input.contact_no,
                password_hash,
            };

            // A concurrent registration that won the unique index lands here.
            self.store.insert(record).await.map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AppError::Conflict(EMAIL_ALREADY_REGISTERED.to_string())
                }
                other => other.into(),
            })
        })
        .await?;

        info!(organizer_id = organizer.id, "Organizer registered, awaiting approval");

        self.request_approval(&organizer, deadline).await;
        Ok(organizer.into())
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let deadline = self.deadline();
        let (email, password) = validate_login(request)?;

        within(deadline, "login", async move {
            let organizer = self
                .store
                .find_by_email(&email)
                .await?
                .ok_or_else(invalid_credentials)?;

            if organizer.status != OrganizerStatus::Approved {
                return Err(AppError::Forbidden(ACCOUNT_NOT_APPROVED.to_string()));
            }

            if !self
                .verify_password(password, organizer.password_hash.clone())
                .await?
            {
                return Err(invalid_credentials());
            }

            let issued = self.tokens.issue(organizer.id, &organizer.email)?;
            info!(organizer_id = organizer.id, "Organizer logged in");

            Ok(LoginResponse {
                token: issued.token,
                token_type: "Bearer".to_string(),
                expires_at: issued.expires_at,
                organizer_id: organizer.id,
            })
        })
        .await
    }

    /// Approve a pending organizer and tell them about it.
    ///
    /// The status change is committed before the email goes out; if sending
    /// fails the call fails, and a retry reports the organizer as already
    /// approved instead of re-running the transition.
    pub async fn approve(&self, organizer_id: i64) -> Result<OrganizerResponse, AppError> {
        let deadline = self.deadline();

        within(deadline, "approve", async move {
            let current = self
                .store
                .find_by_id(organizer_id)
                .await?
                .ok_or_else(|| AppError::NotFound(ORGANIZER_NOT_FOUND.to_string()))?;

            if current.status == OrganizerStatus::Approved {
                return Err(AppError::Conflict(ORGANIZER_ALREADY_APPROVED.to_string()));
            }

            let approved = self
                .store
                .update_status(organizer_id, OrganizerStatus::Pending, OrganizerStatus::Approved)
                .await
                .map_err(|e| match e {
                    StoreError::Conflict(_) => {
                        AppError::Conflict(ORGANIZER_ALREADY_APPROVED.to_string())
                    }
                    StoreError::NotFound(_) => AppError::NotFound(ORGANIZER_NOT_FOUND.to_string()),
                    other => other.into(),
                })?;

            info!(organizer_id, "Organizer approved");

            if let Err(e) = self
                .notifier
                .notify_organizer_approved(&approved.summary())
                .await
            {
                error!(organizer_id, error = %e, "Organizer approved but confirmation email failed");
                return Err(e);
            }

            Ok(approved.into())
        })
        .await
    }

    pub async fn list(&self) -> Result<Vec<OrganizerResponse>, AppError> {
        let organizers = self.store.list().await?;
        Ok(organizers.into_iter().map(OrganizerResponse::from).collect())
    }

    pub async fn get(&self, organizer_id: i64) -> Result<OrganizerResponse, AppError> {
        self.store
            .find_by_id(organizer_id)
            .await?
            .map(OrganizerResponse::from)
            .ok_or_else(|| AppError::NotFound(ORGANIZER_NOT_FOUND.to_string()))
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.operation_timeout
    }

    /// Best effort: a missing admin address or a failed send never undoes
    /// the registration.
    async fn request_approval(&self, organizer: &Organizer, deadline: Instant) {
        let Some(admin_email) = self.config.admin_email.as_deref() else {
            warn!(
                organizer_id = organizer.id,
                "No admin email configured, skipping approval request"
            );
            return;
        };

        let link = match self.approval_link(organizer.id) {
            Ok(link) => link,
            Err(e) => {
                warn!(organizer_id = organizer.id, error = %e, "Failed to build approval link");
                return;
            }
        };
        let sent = within(deadline, "register", async move {
            self.notifier
                .notify_admin(admin_email, &organizer.summary(), &link)
                .await
        })
        .await;

        if let Err(e) = sent {
            warn!(organizer_id = organizer.id, error = %e, "Failed to send approval request to admin");
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                AppError::InternalServerError(format!("Password verification task failed: {}", e))
            })?
    }
}

async fn within<T, F>(deadline: Instant, operation: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(operation)),
    }
}

fn invalid_credentials() -> AppError {
    AppError::AuthError(INVALID_CREDENTIALS.to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_registration(request: RegisterRequest) -> Result<Registration, AppError> {
    let fields = (
        present(request.fname),
        present(request.lname),
        present(request.email),
        present(request.password),
    );
    let (Some(fname), Some(lname), Some(email), Some(password)) = fields else {
        return Err(AppError::ValidationError(REGISTER_FIELDS_REQUIRED.to_string()));
    };

    Ok(Registration {
        fname: fname.trim().to_string(),
        lname: lname.trim().to_string(),
        email: normalize_email(&email),
        // Passwords are taken verbatim
        password,
        contact_no: present(request.contact_no).map(|c| c.trim().to_string()),
    })
}

fn validate_login(request: LoginRequest) -> Result<(String, String), AppError> {
    match (present(request.email), present(request.password)) {
        (Some(email), Some(password)) => Ok((normalize_email(&email), password)),
        _ => Err(AppError::ValidationError(LOGIN_FIELDS_REQUIRED.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::auth::Argon2Hasher;
    use crate::models::OrganizerSummary;
    use crate::store::{MemoryStore, StoreResult};

    const SECRET: &[u8] = b"directory-test-secret-0123456789abcdef";

    struct CountingHasher {
        inner: Argon2Hasher,
        verifications: AtomicUsize,
    }

    impl CredentialHasher for CountingHasher {
        fn hash(&self, plaintext: &str) -> Result<String, AppError> {
            self.inner.hash(plaintext)
        }

        fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError> {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(plaintext, hash)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        admin: Mutex<Vec<(String, OrganizerSummary, String)>>,
        approved: Mutex<Vec<OrganizerSummary>>,
        fail: AtomicBool,
        stall: AtomicBool,
    }

    impl RecordingNotifier {
        async fn outcome(&self) -> Result<(), AppError> {
            if self.stall.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::ExternalServiceError("smtp down".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_admin(
            &self,
            admin_address: &str,
            organizer: &OrganizerSummary,
            approval_link: &str,
        ) -> Result<(), AppError> {
            self.outcome().await?;
            self.admin.lock().await.push((
                admin_address.to_string(),
                organizer.clone(),
                approval_link.to_string(),
            ));
            Ok(())
        }

        async fn notify_organizer_approved(
            &self,
            organizer: &OrganizerSummary,
        ) -> Result<(), AppError> {
            self.outcome().await?;
            self.approved.lock().await.push(organizer.clone());
            Ok(())
        }
    }

    struct Fixture {
        directory: OrganizerDirectory,
        store: Arc<MemoryStore>,
        hasher: Arc<CountingHasher>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture_with(admin_email: Option<&str>, operation_timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(CountingHasher {
            inner: Argon2Hasher::with_params(1024, 1, 1).unwrap(),
            verifications: AtomicUsize::new(0),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let directory = OrganizerDirectory::new(
            store.clone(),
            hasher.clone(),
            Arc::new(TokenIssuer::new(SECRET, chrono::Duration::hours(1))),
            notifier.clone(),
            DirectoryConfig {
                admin_email: admin_email.map(str::to_string),
                approval_base_url: "http://localhost:3001/api/".to_string(),
                approval_link_ttl: chrono::Duration::days(7),
                operation_timeout,
            },
        );
        Fixture {
            directory,
            store,
            hasher,
            notifier,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Some("admin@mail.com"), Duration::from_secs(10))
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            fname: Some("John".to_string()),
            lname: Some("Doe".to_string()),
            email: Some(email.to_string()),
            password: Some("pass".to_string()),
            contact_no: None,
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    async fn approved_organizer(f: &Fixture, email: &str) -> i64 {
        let created = f.directory.register(registration(email)).await.unwrap();
        f.directory.approve(created.id).await.unwrap();
        created.id
    }

    #[tokio::test]
    async fn test_register_creates_pending_and_notifies_admin() {
        let f = fixture();
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();

        assert_eq!(created.status, OrganizerStatus::Pending);
        assert_eq!(created.name, "John Doe");
        assert_eq!(created.username, "new@mail.com");

        let admin = f.notifier.admin.lock().await;
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].0, "admin@mail.com");
        assert_eq!(admin[0].1.name, "John Doe");

        let prefix = format!(
            "http://localhost:3001/api/organizers/{}/approve?token=",
            created.id
        );
        let token = admin[0].2.strip_prefix(&prefix).unwrap();
        let issuer = TokenIssuer::new(SECRET, chrono::Duration::hours(1));
        assert!(issuer.verify_approval(token, created.id).is_ok());
        assert!(issuer.verify_approval(token, created.id + 1).is_err());
    }

    #[tokio::test]
    async fn test_register_stores_only_a_hash() {
        let f = fixture();
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();

        let stored = f.store.find_by_id(created.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pass");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let f = fixture();
        let mut request = registration("new@mail.com");
        request.lname = Some("  ".to_string());

        let err = f.directory.register(request).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == REGISTER_FIELDS_REQUIRED));
        assert!(f.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_pending_and_approved_emails() {
        let f = fixture();
        f.directory.register(registration("pending@mail.com")).await.unwrap();
        approved_organizer(&f, "approved@mail.com").await;

        for email in ["pending@mail.com", "APPROVED@mail.com "] {
            let err = f.directory.register(registration(email)).await.unwrap_err();
            assert!(matches!(err, AppError::Conflict(ref m) if m == EMAIL_ALREADY_REGISTERED));
        }
        assert_eq!(f.store.list().await.unwrap().len(), 2);
    }

    /// Misses every email on lookup, so only the insert can detect a taken
    /// address, as when two registrations race past the lookup.
    struct LateConflictStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl OrganizerStore for LateConflictStore {
        async fn find_by_email(&self, _email: &str) -> StoreResult<Option<Organizer>> {
            Ok(None)
        }

        async fn find_by_id(&self, id: i64) -> StoreResult<Option<Organizer>> {
            self.inner.find_by_id(id).await
        }

        async fn insert(&self, record: NewOrganizer) -> StoreResult<Organizer> {
            self.inner.insert(record).await
        }

        async fn update_status(
            &self,
            id: i64,
            from: OrganizerStatus,
            to: OrganizerStatus,
        ) -> StoreResult<Organizer> {
            self.inner.update_status(id, from, to).await
        }

        async fn list(&self) -> StoreResult<Vec<Organizer>> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_concurrent_registrations_for_one_email_have_one_winner() {
        let store = Arc::new(LateConflictStore {
            inner: MemoryStore::new(),
        });
        let directory = OrganizerDirectory::new(
            store.clone(),
            Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap()),
            Arc::new(TokenIssuer::new(SECRET, chrono::Duration::hours(1))),
            Arc::new(RecordingNotifier::default()),
            DirectoryConfig {
                admin_email: None,
                approval_base_url: "http://localhost:3001/api".to_string(),
                approval_link_ttl: chrono::Duration::days(7),
                operation_timeout: Duration::from_secs(10),
            },
        );

        let (a, b) = tokio::join!(
            directory.register(registration("race@mail.com")),
            directory.register(registration("Race@mail.com"))
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(
            |r| matches!(r, Err(AppError::Conflict(m)) if m == EMAIL_ALREADY_REGISTERED)
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_without_admin_address_still_succeeds() {
        let f = fixture_with(None, Duration::from_secs(10));
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();

        assert_eq!(created.status, OrganizerStatus::Pending);
        assert!(f.notifier.admin.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_survives_admin_notification_failure() {
        let f = fixture();
        f.notifier.fail.store(true, Ordering::SeqCst);

        let created = f.directory.register(registration("new@mail.com")).await.unwrap();
        assert!(f.store.find_by_id(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_succeeds_for_approved_organizer() {
        let f = fixture();
        let id = approved_organizer(&f, "approved@mail.com").await;

        let response = f.directory.login(login("approved@mail.com", "pass")).await.unwrap();
        assert!(!response.token.is_empty());
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.organizer_id, id);
    }

    #[tokio::test]
    async fn test_login_pending_is_forbidden_without_verifying() {
        let f = fixture();
        f.directory.register(registration("pending@mail.com")).await.unwrap();

        for password in ["pass", "wrong"] {
            let err = f.directory.login(login("pending@mail.com", password)).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(ref m) if m == ACCOUNT_NOT_APPROVED));
        }
        assert_eq!(f.hasher.verifications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let f = fixture();
        approved_organizer(&f, "approved@mail.com").await;

        let unknown = f.directory.login(login("nobody@mail.com", "pass")).await.unwrap_err();
        let wrong = f.directory.login(login("approved@mail.com", "nope")).await.unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, AppError::AuthError(ref m) if m == INVALID_CREDENTIALS));
        assert!(matches!(wrong, AppError::AuthError(ref m) if m == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let f = fixture();
        let err = f
            .directory
            .login(LoginRequest {
                email: Some("a@mail.com".to_string()),
                password: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == LOGIN_FIELDS_REQUIRED));
    }

    #[tokio::test]
    async fn test_approve_is_not_idempotent() {
        let f = fixture();
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();

        let approved = f.directory.approve(created.id).await.unwrap();
        assert_eq!(approved.status, OrganizerStatus::Approved);

        for _ in 0..3 {
            let err = f.directory.approve(created.id).await.unwrap_err();
            assert!(matches!(err, AppError::Conflict(ref m) if m == ORGANIZER_ALREADY_APPROVED));
        }

        assert_eq!(f.notifier.approved.lock().await.len(), 1);
        let stored = f.store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrganizerStatus::Approved);
    }

    #[tokio::test]
    async fn test_approve_unknown_is_not_found() {
        let f = fixture();
        let err = f.directory.approve(404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == ORGANIZER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_approve_notification_failure_keeps_committed_status() {
        let f = fixture();
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();
        f.notifier.fail.store(true, Ordering::SeqCst);

        let err = f.directory.approve(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));

        let stored = f.store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrganizerStatus::Approved);

        f.notifier.fail.store(false, Ordering::SeqCst);
        let retry = f.directory.approve(created.id).await.unwrap_err();
        assert!(matches!(retry, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_approve_times_out_as_retryable_error() {
        let f = fixture_with(Some("admin@mail.com"), Duration::from_millis(200));
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();
        f.notifier.stall.store(true, Ordering::SeqCst);

        let err = f.directory.approve(created.id).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_concurrent_approvals_have_one_winner() {
        let f = Arc::new(fixture());
        let created = f.directory.register(registration("new@mail.com")).await.unwrap();

        let (a, b) = tokio::join!(f.directory.approve(created.id), f.directory.approve(created.id));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(f.notifier.approved.lock().await.len(), 1);
    }
}
