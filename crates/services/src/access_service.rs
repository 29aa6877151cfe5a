use std::env;
use std::sync::Arc;

use exam_core::model::{Role, Student, StudentId, normalize_email};
use storage::repository::{Storage, StudentRepository, WhitelistRepository};

use crate::error::AccessError;

/// Whitelist-based sign-in. The configured admin e-mail always maps to the
/// teacher console.
#[derive(Clone)]
pub struct AccessService {
    admin_email: Option<String>,
    students: Arc<dyn StudentRepository>,
    whitelist: Arc<dyn WhitelistRepository>,
}

impl AccessService {
    #[must_use]
    pub fn new(admin_email: Option<&str>, storage: &Storage) -> Self {
        Self {
            admin_email: admin_email.and_then(|raw| normalize_email(raw).ok()),
            students: Arc::clone(&storage.students),
            whitelist: Arc::clone(&storage.whitelist),
        }
    }

    /// Read the admin e-mail from `EXAM_ADMIN_EMAIL`.
    #[must_use]
    pub fn from_env(storage: &Storage) -> Self {
        let admin = env::var("EXAM_ADMIN_EMAIL").ok();
        Self::new(admin.as_deref(), storage)
    }

    /// Allow an e-mail to sign in.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Student` for a malformed address and
    /// `AccessError::AlreadyWhitelisted` for a duplicate.
    pub async fn whitelist(&self, email: &str) -> Result<String, AccessError> {
        let email = normalize_email(email)?;
        if !self.whitelist.add_email(&email).await? {
            return Err(AccessError::AlreadyWhitelisted);
        }
        tracing::info!(%email, "e-mail whitelisted");
        Ok(email)
    }

    /// # Errors
    ///
    /// Returns `AccessError::Storage` if repository access fails.
    pub async fn whitelisted(&self) -> Result<Vec<String>, AccessError> {
        Ok(self.whitelist.list_emails().await?)
    }

    /// Resolve an e-mail to a user, registering whitelisted newcomers.
    ///
    /// `name` is only used when a new student is created; the local part of
    /// the address stands in when it is blank.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::AccessDenied` when the address is neither the
    /// admin nor whitelisted.
    pub async fn sign_in(&self, email: &str, name: &str) -> Result<Student, AccessError> {
        let email = normalize_email(email)?;

        if let Some(existing) = self.students.find_student_by_email(&email).await? {
            if existing.role() == Role::Teacher || self.is_allowed(&email).await? {
                return Ok(existing);
            }
        }

        let role = if self.admin_email.as_deref() == Some(email.as_str()) {
            Role::Teacher
        } else if self.whitelist.contains_email(&email).await? {
            Role::Student
        } else {
            tracing::warn!(%email, "sign-in denied");
            return Err(AccessError::AccessDenied(email));
        };

        let display_name = match name.trim() {
            "" => email.split('@').next().unwrap_or(email.as_str()).to_string(),
            given => given.to_string(),
        };
        let student = Student::new(StudentId::new(0), display_name, &email, role)?;
        let id = self.students.insert_new_student(&student).await?;
        tracing::info!(%email, role = role.as_str(), "user registered");
        Ok(student.with_id(id))
    }

    async fn is_allowed(&self, email: &str) -> Result<bool, AccessError> {
        if self.admin_email.as_deref() == Some(email) {
            return Ok(true);
        }
        Ok(self.whitelist.contains_email(email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AccessService {
        AccessService::new(Some(" Prof@Escola.br "), &Storage::in_memory())
    }

    #[tokio::test]
    async fn whitelist_normalizes_and_rejects_duplicates() {
        let svc = service();
        assert_eq!(svc.whitelist("  Ana@Escola.BR ").await.unwrap(), "ana@escola.br");
        let err = svc.whitelist("ana@escola.br").await.unwrap_err();
        assert!(matches!(err, AccessError::AlreadyWhitelisted));
        let err = svc.whitelist("   ").await.unwrap_err();
        assert!(matches!(err, AccessError::Student(_)));
    }

    #[tokio::test]
    async fn admin_signs_in_as_teacher() {
        let svc = service();
        let teacher = svc.sign_in("prof@escola.br", "").await.unwrap();
        assert_eq!(teacher.role(), Role::Teacher);
        assert_eq!(teacher.name(), "prof");
    }

    #[tokio::test]
    async fn whitelisted_student_is_registered_once() {
        let svc = service();
        svc.whitelist("ana@escola.br").await.unwrap();

        let first = svc.sign_in("ANA@escola.br", "Ana").await.unwrap();
        assert_eq!(first.role(), Role::Student);
        assert_eq!(first.stats().points, 0);

        let again = svc.sign_in("ana@escola.br", "Other").await.unwrap();
        assert_eq!(again.id(), first.id());
        assert_eq!(again.name(), "Ana");
    }

    #[tokio::test]
    async fn unknown_email_is_denied() {
        let svc = service();
        let err = svc.sign_in("intruso@x.io", "").await.unwrap_err();
        assert!(matches!(err, AccessError::AccessDenied(ref email) if email == "intruso@x.io"));
    }
}
