use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::clients::UserClient;
use crate::domain::{OrderId, User, UserId};
use crate::error::StoreError;
use crate::messages::{StoreResponse, UserRequest};

/// Store task owning the user records plus a lower-cased email index.
///
/// `Register` checks uniqueness and inserts in one message, so two
/// concurrent registrations with the same email cannot both win.
pub struct UserStore {
    receiver: mpsc::Receiver<UserRequest>,
    users: HashMap<UserId, User>,
    email_index: HashMap<String, UserId>,
}

impl UserStore {
    pub fn new(buffer_size: usize) -> (Self, UserClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            users: HashMap::new(),
            email_index: HashMap::new(),
        };
        let client = UserClient::new(sender);
        (store, client)
    }

    #[instrument(name = "user_store", skip(self))]
    pub async fn run(mut self) {
        info!("UserStore starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                UserRequest::Save { user, respond_to } => {
                    self.handle_save(user, respond_to);
                }
                UserRequest::Register { user, respond_to } => {
                    self.handle_register(user, respond_to);
                }
                UserRequest::Get { id, respond_to } => {
                    self.handle_get(id, respond_to);
                }
                UserRequest::GetByEmail { email, respond_to } => {
                    self.handle_get_by_email(email, respond_to);
                }
                UserRequest::ListActive { respond_to } => {
                    self.handle_list(true, respond_to);
                }
                UserRequest::ListAll { respond_to } => {
                    self.handle_list(false, respond_to);
                }
                UserRequest::ExistsByEmail { email, respond_to } => {
                    let _ = respond_to.send(Ok(self
                        .email_index
                        .contains_key(&email.to_lowercase())));
                }
                UserRequest::Authenticate {
                    email,
                    password,
                    respond_to,
                } => {
                    self.handle_authenticate(email, password, respond_to);
                }
                UserRequest::AppendHistory {
                    user_id,
                    order_id,
                    respond_to,
                } => {
                    self.handle_append_history(user_id, order_id, respond_to);
                }
                UserRequest::UpdateProfile {
                    id,
                    name,
                    phone,
                    messaging_handle,
                    respond_to,
                } => {
                    self.handle_update_profile(id, name, phone, messaging_handle, respond_to);
                }
                UserRequest::Deactivate { id, respond_to } => {
                    self.handle_deactivate(id, respond_to);
                }
                UserRequest::Shutdown => {
                    info!("UserStore shutting down");
                    break;
                }
                #[cfg(test)]
                UserRequest::Count { respond_to } => {
                    let _ = respond_to.send(Ok(self.users.len()));
                }
            }
        }

        info!("UserStore stopped");
    }

    /// Upsert; the email index follows every save, dropping the stale key
    /// when a save changes the user's email.
    #[instrument(fields(user_id = %user.id, user_email = %user.email), skip(self, user, respond_to))]
    fn handle_save(&mut self, user: User, respond_to: StoreResponse<User>) {
        debug!("Processing save request");

        if let Some(previous) = self.users.get(&user.id) {
            let stale = previous.email.to_lowercase();
            if stale != user.email.to_lowercase() {
                self.email_index.remove(&stale);
            }
        }
        self.email_index.insert(user.email.to_lowercase(), user.id);
        self.users.insert(user.id, user.clone());

        info!("User saved");
        let _ = respond_to.send(Ok(user));
    }

    #[instrument(fields(user_email = %user.email), skip(self, user, respond_to))]
    fn handle_register(&mut self, user: User, respond_to: StoreResponse<User>) {
        debug!("Processing register request");

        let key = user.email.to_lowercase();
        let result = if self.email_index.contains_key(&key) {
            error!("Email already registered");
            Err(StoreError::conflict(format!(
                "email already registered: {}",
                user.email
            )))
        } else {
            self.email_index.insert(key, user.id);
            self.users.insert(user.id, user.clone());
            info!(user_id = %user.id, "User registered");
            Ok(user)
        };

        let _ = respond_to.send(result);
    }

    #[instrument(fields(user_id = %id), skip(self, respond_to))]
    fn handle_get(&self, id: UserId, respond_to: StoreResponse<Option<User>>) {
        debug!("Processing get request");

        let user = self.users.get(&id).cloned();

        match &user {
            Some(user) => debug!(user_name = %user.name, "User found"),
            None => debug!("User not found"),
        }

        let _ = respond_to.send(Ok(user));
    }

    #[instrument(fields(user_email = %email), skip(self, email, respond_to))]
    fn handle_get_by_email(&self, email: String, respond_to: StoreResponse<Option<User>>) {
        debug!("Processing get_by_email request");

        // A blank key never matches, even when an unvalidated save indexed one.
        let user = if email.trim().is_empty() {
            None
        } else {
            self.email_index
                .get(&email.to_lowercase())
                .and_then(|id| self.users.get(id))
                .cloned()
        };

        match &user {
            Some(user) => debug!(user_id = %user.id, "User found"),
            None => debug!("User not found"),
        }

        let _ = respond_to.send(Ok(user));
    }

    #[instrument(skip(self, respond_to))]
    fn handle_list(&self, active_only: bool, respond_to: StoreResponse<Vec<User>>) {
        debug!("Processing list request");

        let mut users: Vec<User> = self
            .users
            .values()
            .filter(|u| u.active || !active_only)
            .cloned()
            .collect();
        // v7 ids sort by creation time, so this is registration order
        users.sort_by_key(|u| u.id);

        info!(user_count = users.len(), "Listed users");
        let _ = respond_to.send(Ok(users));
    }

    /// One "no match" answer regardless of the cause: unknown email, wrong
    /// password, and deactivated account are indistinguishable.
    #[instrument(fields(user_email = %email), skip(self, email, password, respond_to))]
    fn handle_authenticate(
        &self,
        email: String,
        password: String,
        respond_to: StoreResponse<Option<User>>,
    ) {
        debug!("Processing authenticate request");

        let user = self
            .email_index
            .get(&email.to_lowercase())
            .and_then(|id| self.users.get(id))
            .filter(|user| user.active && user.password == password)
            .cloned();

        match &user {
            Some(user) => info!(user_id = %user.id, "Credentials accepted"),
            None => debug!("Credentials rejected"),
        }

        let _ = respond_to.send(Ok(user));
    }

    /// The name applies only when non-blank; phone and messaging handle
    /// are replaced as given, so `None` clears them.
    #[instrument(fields(user_id = %id), skip(self, name, phone, messaging_handle, respond_to))]
    fn handle_update_profile(
        &mut self,
        id: UserId,
        name: Option<String>,
        phone: Option<String>,
        messaging_handle: Option<String>,
        respond_to: StoreResponse<User>,
    ) {
        debug!("Processing update_profile request");

        let result = match self.users.get_mut(&id) {
            Some(user) => {
                if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
                    user.name = name;
                }
                user.phone = phone;
                user.messaging_handle = messaging_handle;
                info!("Profile updated");
                Ok(user.clone())
            }
            None => {
                error!("User not found for profile update");
                Err(StoreError::not_found("user", id))
            }
        };

        let _ = respond_to.send(result);
    }

    #[instrument(fields(user_id = %id), skip(self, respond_to))]
    fn handle_deactivate(&mut self, id: UserId, respond_to: StoreResponse<()>) {
        debug!("Processing deactivate request");

        let result = match self.users.get_mut(&id) {
            Some(user) => {
                user.deactivate();
                info!("User deactivated");
                Ok(())
            }
            None => {
                error!("User not found for deactivation");
                Err(StoreError::not_found("user", id))
            }
        };

        let _ = respond_to.send(result);
    }

    #[instrument(fields(user_id = %user_id, order_id = %order_id), skip(self, respond_to))]
    fn handle_append_history(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
        respond_to: StoreResponse<()>,
    ) {
        debug!("Processing append_history request");

        let result = match self.users.get_mut(&user_id) {
            Some(user) => {
                user.record_order(order_id);
                info!(history_len = user.order_history.len(), "Order recorded");
                Ok(())
            }
            None => {
                error!("User not found for history append");
                Err(StoreError::not_found("user", user_id))
            }
        };

        let _ = respond_to.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_store() -> UserClient {
        let (store, client) = UserStore::new(16);
        tokio::spawn(store.run());
        client
    }

    #[tokio::test]
    async fn register_rejects_duplicate_emails_case_insensitively() {
        let client = spawn_store();

        client
            .register_user(User::new("Alice", "Alice@Example.com", "secret1"))
            .await
            .unwrap();

        let denied = client
            .register_user(User::new("Al", "alice@example.COM", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(denied, StoreError::Conflict(_)));
        assert_eq!(client.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let client = spawn_store();
        let alice = client
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let found = client
            .get_user_by_email("ALICE@EXAMPLE.COM".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, alice.id);

        assert!(client.user_exists_by_email("Alice@example.com".to_string()).await.unwrap());
        assert!(client
            .get_user_by_email("bob@example.com".to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn blank_email_lookups_match_nobody() {
        let client = spawn_store();

        // Saves skip registration validation, so a blank email can be indexed.
        client
            .save_user(User::new("Ghost", "", "secret1"))
            .await
            .unwrap();

        assert_eq!(client.get_user_by_email("".to_string()).await.unwrap(), None);
        assert_eq!(client.get_user_by_email("   ".to_string()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn saving_a_changed_email_drops_the_stale_index_entry() {
        let client = spawn_store();
        let mut alice = client
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        alice.email = "alice@new.example".to_string();
        client.save_user(alice.clone()).await.unwrap();

        assert!(client
            .get_user_by_email("alice@example.com".to_string())
            .await
            .unwrap()
            .is_none());
        let found = client
            .get_user_by_email("alice@new.example".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, alice.id);
    }

    #[tokio::test]
    async fn authenticate_accepts_only_active_exact_matches() {
        let client = spawn_store();
        let mut alice = client
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let accepted = client
            .authenticate("alice@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap();
        assert!(accepted.is_some());

        let wrong_password = client
            .authenticate("alice@example.com".to_string(), "secret2".to_string())
            .await
            .unwrap();
        let unknown_email = client
            .authenticate("bob@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap();
        assert_eq!(wrong_password, unknown_email);

        alice.deactivate();
        client.save_user(alice).await.unwrap();
        let inactive = client
            .authenticate("alice@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap();
        assert!(inactive.is_none());
    }

    #[tokio::test]
    async fn history_appends_stay_in_order() {
        let client = spawn_store();
        let alice = client
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let first = OrderId::new();
        let second = OrderId::new();
        client.append_history(alice.id, first).await.unwrap();
        client.append_history(alice.id, second).await.unwrap();

        let stored = client.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.order_history, vec![first, second]);

        let missing = client.append_history(UserId::new(), first).await.unwrap_err();
        assert!(matches!(missing, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn profile_update_ignores_blank_names_and_replaces_contacts() {
        let client = spawn_store();
        let alice = client
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let updated = client
            .update_profile(
                alice.id,
                Some("   ".to_string()),
                Some("+1555123456".to_string()),
                Some("@alice".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.phone.as_deref(), Some("+1555123456"));
        assert_eq!(updated.messaging_handle.as_deref(), Some("@alice"));

        let cleared = client
            .update_profile(alice.id, Some("Alice B".to_string()), None, None)
            .await
            .unwrap();
        assert_eq!(cleared.name, "Alice B");
        assert!(cleared.phone.is_none());
        assert!(cleared.messaging_handle.is_none());
    }

    #[tokio::test]
    async fn active_listing_hides_deactivated_users() {
        let client = spawn_store();
        let alice = client
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        client
            .register_user(User::new("Bob", "bob@example.com", "secret2"))
            .await
            .unwrap();

        client.deactivate_user(alice.id).await.unwrap();

        assert_eq!(client.list_active_users().await.unwrap().len(), 1);
        assert_eq!(client.list_all_users().await.unwrap().len(), 2);

        let deactivated = client
            .authenticate("alice@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap();
        assert!(deactivated.is_none());
    }
}
