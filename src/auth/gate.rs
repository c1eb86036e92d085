//! The authentication and authorization gate.
//!
//! Given the level a route requires and the request's `Authorization`
//! header, the gate either produces an [`Identity`] or rejects the request.
//! Credentials arrive as `Bearer <key_id>:<secret>`. The reserved key id
//! `admin` is checked against the operator-configured superuser password
//! instead of the credential store; every other key id must exist in the
//! store, carry a sufficient role and, when the route names a bucket, be
//! scoped to that bucket.

use axum::http::HeaderValue;
use tracing::debug;

use crate::{
    auth::{
        role::{AuthLevel, Role},
        secret::{hash_matches, hash_secret, verify_secret},
    },
    errors::{GatewayError, GatewayResult},
    services::{credential_store::CredentialStore, metadata_store::MetadataStore},
};

/// Key id reserved for the superuser login.
pub const SUPERUSER_KEY_ID: &str = "admin";

const BEARER_SCHEME: &str = "Bearer";

/// Which buckets an identity may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketScope {
    /// The superuser; never bound to a bucket.
    AllBuckets,
    Bucket(i64),
}

/// The caller, as established by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub key_id: String,
    pub scope: BucketScope,
    pub role: Role,
}

impl Identity {
    fn superuser() -> Self {
        Self {
            key_id: SUPERUSER_KEY_ID.to_string(),
            scope: BucketScope::AllBuckets,
            role: Role::All,
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.scope == BucketScope::AllBuckets
    }

    pub fn can_access(&self, bucket_id: i64) -> bool {
        match self.scope {
            BucketScope::AllBuckets => true,
            BucketScope::Bucket(id) => id == bucket_id,
        }
    }
}

/// `key_id:secret` as presented by the caller.
#[derive(PartialEq, Eq)]
pub struct Credentials<'a> {
    pub key_id: &'a str,
    pub secret: &'a str,
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"***")
            .finish()
    }
}

/// Split an `Authorization` header into credentials.
///
/// A missing header and a malformed one are reported as different errors.
pub fn parse_authorization(header: Option<&HeaderValue>) -> GatewayResult<Credentials<'_>> {
    let header = header.ok_or(GatewayError::CredentialMissing)?;
    let value = header
        .to_str()
        .map_err(|_| GatewayError::CredentialMalformed("header is not visible ASCII"))?;

    let (scheme, rest) = value.split_once(' ').ok_or(GatewayError::CredentialMalformed(
        "expected 'Bearer <key_id>:<secret>'",
    ))?;
    if scheme != BEARER_SCHEME {
        return Err(GatewayError::CredentialMalformed(
            "expected 'Bearer <key_id>:<secret>'",
        ));
    }

    let (key_id, secret) = rest.split_once(':').ok_or(GatewayError::CredentialMalformed(
        "expected 'key_id:secret'",
    ))?;
    if key_id.is_empty() {
        return Err(GatewayError::CredentialMalformed("empty key_id"));
    }

    Ok(Credentials { key_id, secret })
}

#[derive(Clone)]
pub struct AuthGate {
    credentials: CredentialStore,
    metadata: MetadataStore,
    /// Digest of the superuser password; `None` disables the `admin` login.
    superuser_hash: Option<String>,
}

impl AuthGate {
    pub fn new(
        credentials: CredentialStore,
        metadata: MetadataStore,
        superuser_password: Option<&str>,
    ) -> Self {
        Self {
            credentials,
            metadata,
            superuser_hash: superuser_password
                .filter(|pw| !pw.is_empty())
                .map(hash_secret),
        }
    }

    /// Run the gate for `level`. Open routes yield `None` without reading the header.
    pub async fn admit(
        &self,
        level: AuthLevel,
        header: Option<&HeaderValue>,
        bucket: Option<&str>,
    ) -> GatewayResult<Option<Identity>> {
        match level.minimum_role() {
            None => Ok(None),
            Some(required) => self.authenticate(required, header, bucket).await.map(Some),
        }
    }

    /// Establish the caller's identity and check it against `required` and `bucket`.
    pub async fn authenticate(
        &self,
        required: Role,
        header: Option<&HeaderValue>,
        bucket: Option<&str>,
    ) -> GatewayResult<Identity> {
        let credentials = parse_authorization(header)?;

        if credentials.key_id == SUPERUSER_KEY_ID {
            return self.authenticate_superuser(credentials.secret);
        }

        // Hashed before the lookup so unknown key ids do the same work as known ones.
        let presented = hash_secret(credentials.secret);
        let key = self
            .credentials
            .find_by_key_id(credentials.key_id)
            .await?
            .ok_or(GatewayError::CredentialInvalid("key_id not found"))?;

        if !hash_matches(&presented, &key.secret_hash) {
            return Err(GatewayError::CredentialInvalid("secret mismatch"));
        }

        if !key.role.admits(required.into()) {
            debug!(key_id = %key.key_id, role = %key.role, required = %required, "role too weak");
            return Err(GatewayError::InsufficientRole);
        }

        if let Some(name) = bucket {
            let target = self
                .metadata
                .bucket_by_name(name)
                .await?
                .ok_or_else(|| GatewayError::not_found(format!("bucket `{}`", name)))?;
            if target.id != key.bucket_id {
                debug!(key_id = %key.key_id, bucket = name, "key scoped to another bucket");
                return Err(GatewayError::BucketScopeMismatch);
            }
        }

        Ok(Identity {
            key_id: key.key_id,
            scope: BucketScope::Bucket(key.bucket_id),
            role: key.role,
        })
    }

    fn authenticate_superuser(&self, secret: &str) -> GatewayResult<Identity> {
        let expected = self
            .superuser_hash
            .as_deref()
            .ok_or(GatewayError::CredentialInvalid(
                "admin authentication not configured",
            ))?;
        if !verify_secret(secret, expected) {
            return Err(GatewayError::CredentialInvalid("invalid admin password"));
        }
        Ok(Identity::superuser())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ADMIN_PASSWORD, TestEnv, bearer, key_for};

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    #[test]
    fn parses_bearer_credentials() {
        let value = header("Bearer abc:def:ghi");
        let creds = parse_authorization(Some(&value)).unwrap();
        assert_eq!(creds.key_id, "abc");
        assert_eq!(creds.secret, "def:ghi");
    }

    #[test]
    fn missing_and_malformed_are_distinct() {
        assert!(matches!(
            parse_authorization(None),
            Err(GatewayError::CredentialMissing)
        ));
        for bad in ["Basic abc:def", "Bearer", "Bearer abcdef", "Bearer :secret", "bearer a:b"] {
            let value = header(bad);
            assert!(
                matches!(
                    parse_authorization(Some(&value)),
                    Err(GatewayError::CredentialMalformed(_))
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let value = header("Bearer abc:topsecret");
        let creds = parse_authorization(Some(&value)).unwrap();
        assert!(!format!("{:?}", creds).contains("topsecret"));
    }

    #[tokio::test]
    async fn open_level_admits_without_header() {
        let env = TestEnv::new().await;
        let admitted = env.state.gate.admit(AuthLevel::None, None, None).await.unwrap();
        assert_eq!(admitted, None);

        let garbage = header("Basic not-even-close");
        let admitted = env
            .state
            .gate
            .admit(AuthLevel::None, Some(&garbage), Some("missing"))
            .await
            .unwrap();
        assert_eq!(admitted, None);
    }

    #[tokio::test]
    async fn guarded_levels_run_the_full_gate() {
        let env = TestEnv::new().await;
        let created = env.bucket("photos").await;
        let ro = key_for(&created, Role::ReadOnly);

        let admitted = env
            .state
            .gate
            .admit(AuthLevel::ReadOnly, Some(&bearer(ro)), Some("photos"))
            .await
            .unwrap();
        assert_eq!(admitted.map(|identity| identity.role), Some(Role::ReadOnly));

        let err = env
            .state
            .gate
            .admit(AuthLevel::ReadWrite, Some(&bearer(ro)), Some("photos"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientRole));
        let err = env
            .state
            .gate
            .admit(AuthLevel::ReadOnly, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CredentialMissing));
    }

    #[tokio::test]
    async fn another_keys_secret_is_rejected() {
        let env = TestEnv::new().await;
        let created = env.bucket("photos").await;
        let ro = key_for(&created, Role::ReadOnly);
        let rw = key_for(&created, Role::ReadWrite);

        let swapped = header(&format!("Bearer {}:{}", ro.key_id, rw.secret.expose()));
        let err = env
            .state
            .gate
            .authenticate(Role::ReadOnly, Some(&swapped), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CredentialInvalid("secret mismatch")));
    }

    #[tokio::test]
    async fn valid_key_authenticates_with_its_role() {
        let env = TestEnv::new().await;
        let created = env.bucket("photos").await;
        let rw = key_for(&created, Role::ReadWrite);

        let identity = env
            .state
            .gate
            .authenticate(Role::ReadOnly, Some(&bearer(rw)), Some("photos"))
            .await
            .unwrap();
        assert_eq!(identity.role, Role::ReadWrite);
        assert_eq!(identity.key_id, rw.key_id);
        assert_eq!(identity.scope, BucketScope::Bucket(created.bucket.id));
        assert!(!identity.is_superuser());
    }

    #[tokio::test]
    async fn unknown_key_and_wrong_secret_are_invalid() {
        let env = TestEnv::new().await;
        let created = env.bucket("photos").await;
        let ro = key_for(&created, Role::ReadOnly);

        let unknown = header("Bearer nosuchkey:whatever");
        let err = env
            .state
            .gate
            .authenticate(Role::ReadOnly, Some(&unknown), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CredentialInvalid("key_id not found")));

        let wrong = header(&format!("Bearer {}:{}x", ro.key_id, ro.secret.expose()));
        let err = env
            .state
            .gate
            .authenticate(Role::ReadOnly, Some(&wrong), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CredentialInvalid("secret mismatch")));
    }

    #[tokio::test]
    async fn roles_below_requirement_are_forbidden() {
        let env = TestEnv::new().await;
        let created = env.bucket("photos").await;

        for held in Role::ALL {
            let key = key_for(&created, held);
            for required in Role::ALL {
                let result = env
                    .state
                    .gate
                    .authenticate(required, Some(&bearer(key)), Some("photos"))
                    .await;
                if held >= required {
                    assert!(result.is_ok(), "{held} should pass {required}");
                } else {
                    assert!(
                        matches!(result, Err(GatewayError::InsufficientRole)),
                        "{held} should fail {required}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn scoping_is_absolute_even_for_all_role() {
        let env = TestEnv::new().await;
        let photos = env.bucket("photos").await;
        env.bucket("videos").await;

        for role in Role::ALL {
            let key = key_for(&photos, role);
            let err = env
                .state
                .gate
                .authenticate(Role::ReadOnly, Some(&bearer(key)), Some("videos"))
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::BucketScopeMismatch), "{role}");
        }
    }

    #[tokio::test]
    async fn unknown_named_bucket_is_not_found() {
        let env = TestEnv::new().await;
        let photos = env.bucket("photos").await;
        let key = key_for(&photos, Role::All);
        let err = env
            .state
            .gate
            .authenticate(Role::ReadOnly, Some(&bearer(key)), Some("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn superuser_is_unscoped() {
        let env = TestEnv::new().await;
        env.bucket("photos").await;

        let admin = header(&format!("Bearer admin:{}", ADMIN_PASSWORD));
        for bucket in [Some("photos"), Some("does-not-matter"), None] {
            let identity = env
                .state
                .gate
                .authenticate(Role::All, Some(&admin), bucket)
                .await
                .unwrap();
            assert!(identity.is_superuser());
            assert_eq!(identity.role, Role::All);
            assert!(identity.can_access(12345));
        }

        let wrong = header("Bearer admin:not-the-password");
        let err = env
            .state
            .gate
            .authenticate(Role::ReadOnly, Some(&wrong), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CredentialInvalid("invalid admin password")));
    }

    #[tokio::test]
    async fn superuser_login_fails_closed_without_password() {
        for configured in [None, Some("")] {
            let env = TestEnv::with_admin(configured).await;
            for attempt in ["Bearer admin:", "Bearer admin:anything"] {
                let err = env
                    .state
                    .gate
                    .authenticate(Role::ReadOnly, Some(&header(attempt)), None)
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    GatewayError::CredentialInvalid("admin authentication not configured")
                ));
            }
        }
    }
}
