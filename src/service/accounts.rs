use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::clients::{OrderClient, UserClient};
use crate::domain::{Order, User, UserId};
use crate::error::StoreError;

/// Shape check only; the mailbox is never verified.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").expect("static email pattern"));

const MIN_PASSWORD_CHARS: usize = 6;

/// User accounts on top of the user store: registration, credential
/// checks, profile edits and the per-user order history view.
#[derive(Clone)]
pub struct Accounts {
    users: UserClient,
    orders: OrderClient,
}

impl Accounts {
    pub fn new(users: UserClient, orders: OrderClient) -> Self {
        Self { users, orders }
    }

    /// Validates the registration fields here; the store enforces email
    /// uniqueness so concurrent registrations cannot race past the check.
    #[instrument(fields(user_email = %email), skip(self, name, email, password))]
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        info!("Processing register_user request");

        if name.trim().is_empty() {
            error!("User name is blank");
            return Err(StoreError::validation("user name must not be blank"));
        }
        if email.trim().is_empty() {
            error!("Email is blank");
            return Err(StoreError::validation("email must not be blank"));
        }
        if !EMAIL_SHAPE.is_match(email) {
            error!("Email is malformed");
            return Err(StoreError::validation("email address is malformed"));
        }
        if password.trim().is_empty() {
            error!("Password is blank");
            return Err(StoreError::validation("password must not be blank"));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            error!("Password too short");
            return Err(StoreError::validation(
                "password must be at least 6 characters",
            ));
        }

        let user = self
            .users
            .register_user(User::new(name, email, password))
            .await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// A failed check gives the same error whether the email is unknown
    /// or the password is wrong.
    #[instrument(fields(user_email = %email), skip(self, email, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, StoreError> {
        info!("Processing authenticate request");

        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(StoreError::validation("email and password are required"));
        }

        self.users
            .authenticate(email.to_string(), password.to_string())
            .await?
            .ok_or(StoreError::Authentication)
    }

    pub async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.users.get_user(id).await
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users.get_user_by_email(email.to_string()).await
    }

    pub async fn active_users(&self) -> Result<Vec<User>, StoreError> {
        self.users.list_active_users().await
    }

    pub async fn all_users(&self) -> Result<Vec<User>, StoreError> {
        self.users.list_all_users().await
    }

    /// Contact fields are replaced as given; a `None` clears the channel.
    /// The name only changes when a non-blank one is supplied.
    #[instrument(fields(user_id = %id), skip(self, name, phone, messaging_handle))]
    pub async fn update_profile(
        &self,
        id: UserId,
        name: Option<String>,
        phone: Option<String>,
        messaging_handle: Option<String>,
    ) -> Result<User, StoreError> {
        info!("Processing update_profile request");
        self.users
            .update_profile(id, name, phone, messaging_handle)
            .await
    }

    /// Soft delete: the account stops listing and authenticating but its
    /// record and history stay resolvable.
    #[instrument(fields(user_id = %id), skip(self))]
    pub async fn deactivate_user(&self, id: UserId) -> Result<(), StoreError> {
        info!("Processing deactivate_user request");
        self.users.deactivate_user(id).await
    }

    /// Resolves the user's recorded order ids in the sequence they were
    /// placed. Ids that no longer resolve are skipped.
    #[instrument(fields(user_id = %user_id), skip(self))]
    pub async fn order_history(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("user", user_id))?;

        let mut history = Vec::with_capacity(user.order_history.len());
        for order_id in user.order_history {
            match self.orders.get_order(order_id).await? {
                Some(order) => history.push(order),
                None => warn!(%order_id, "Recorded order no longer resolves"),
            }
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderItem, Product};
    use crate::stores::{OrderStore, UserStore};
    use rust_decimal_macros::dec;

    fn service() -> (Accounts, OrderClient) {
        let (user_store, users) = UserStore::new(16);
        tokio::spawn(user_store.run());
        let (order_store, orders) = OrderStore::new(16);
        tokio::spawn(order_store.run());
        (Accounts::new(users, orders.clone()), orders)
    }

    #[tokio::test]
    async fn registration_checks_every_field() {
        let (accounts, _) = service();

        for (name, email, password) in [
            ("   ", "alice@example.com", "secret1"),
            ("Alice", "   ", "secret1"),
            ("Alice", "not-an-address", "secret1"),
            ("Alice", "@example.com", "secret1"),
            ("Alice", "alice@example.com", "five5"),
            ("Alice", "alice@example.com", "      "),
        ] {
            let denied = accounts.register_user(name, email, password).await.unwrap_err();
            assert!(matches!(denied, StoreError::Validation(_)), "{email} / {password:?}");
        }

        let alice = accounts
            .register_user("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();
        assert!(alice.active);
        assert_eq!(alice.email, "alice@example.com");
    }

    #[tokio::test]
    async fn duplicate_emails_conflict_regardless_of_case() {
        let (accounts, _) = service();
        accounts
            .register_user("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        let denied = accounts
            .register_user("Imposter", "ALICE@Example.Com", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(denied, StoreError::Conflict(_)));
        assert_eq!(accounts.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_logins_are_indistinguishable() {
        let (accounts, _) = service();
        accounts
            .register_user("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        let authenticated = accounts
            .authenticate("alice@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(authenticated.name, "Alice");

        let wrong_password = accounts
            .authenticate("alice@example.com", "wrong99")
            .await
            .unwrap_err();
        let unknown_email = accounts
            .authenticate("nobody@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(wrong_password, unknown_email);
        assert_eq!(wrong_password, StoreError::Authentication);
    }

    #[tokio::test]
    async fn blank_credentials_fail_validation_not_authentication() {
        let (accounts, _) = service();

        let denied = accounts.authenticate("", "secret1").await.unwrap_err();
        assert!(matches!(denied, StoreError::Validation(_)));

        let denied = accounts
            .authenticate("alice@example.com", "")
            .await
            .unwrap_err();
        assert!(matches!(denied, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn deactivated_accounts_stop_authenticating() {
        let (accounts, _) = service();
        let alice = accounts
            .register_user("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        accounts.deactivate_user(alice.id).await.unwrap();

        let denied = accounts
            .authenticate("alice@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(denied, StoreError::Authentication);
        assert!(accounts.active_users().await.unwrap().is_empty());
        assert!(accounts.user(alice.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn order_history_resolves_ids_and_skips_stale_ones() {
        let (accounts, orders) = service();
        let alice = accounts
            .register_user("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        let widget = Product::new("Widget", "A widget", dec!(10.00), 5);
        let order = orders
            .save_order(Order::new(alice.id, vec![OrderItem::new(&widget, 2)]))
            .await
            .unwrap();

        accounts
            .users
            .append_history(alice.id, order.id)
            .await
            .unwrap();
        accounts
            .users
            .append_history(alice.id, OrderId::new())
            .await
            .unwrap();

        let history = accounts.order_history(alice.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, order.id);

        let missing = accounts.order_history(UserId::new()).await.unwrap_err();
        assert!(matches!(missing, StoreError::NotFound { entity: "user", .. }));
    }
}
