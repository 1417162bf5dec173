//! Users service: signup, activation, login and profile

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use super::{
    email::{self, Mailer},
    lookup::{self, LookupChoice, LookupService},
    tokens::{self, ActivationTokens},
};
use crate::{
    config::{AuthConfig, SiteConfig},
    error::{AppError, AppResult},
    models::{
        address::{ContactInfo, LookupTable, NewProfile, ProfileChanges, ProfileUpdate, ProfileView},
        user::{Account, LoginRequest, LoginResponse, NewAccount, ResendActivation, SignupForm, UserClaims},
    },
    repository::Repository,
};

const LOGIN_FAILED: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    lookups: LookupService,
    mailer: Arc<dyn Mailer>,
    tokens: ActivationTokens,
    auth_config: AuthConfig,
    site: SiteConfig,
}

impl UsersService {
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        site: SiteConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            lookups: LookupService::new(repository.clone()),
            tokens: ActivationTokens::new(auth_config.jwt_secret.clone(), auth_config.activation_token_hours),
            repository,
            mailer,
            auth_config,
            site,
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.accounts.ping().await
    }

    /// Register an inactive account and mail its activation link
    #[tracing::instrument(skip(self, form), fields(username = %form.username))]
    pub async fn signup(&self, form: SignupForm) -> AppResult<Account> {
        form.validate()?;

        if self.repository.accounts.username_exists(&form.username).await? {
            return Err(AppError::Conflict("A user with that username already exists.".to_string()));
        }

        let city = self
            .lookups
            .resolve(LookupTable::City, form.pick_city.as_deref(), form.add_city.as_deref())
            .await?;
        let street = self
            .lookups
            .resolve(LookupTable::Street, form.pick_street.as_deref(), form.add_street.as_deref())
            .await?;

        let account = NewAccount {
            username: form.username,
            email: form.email,
            password_hash: self.hash_password(&form.password1)?,
        };
        let profile = NewProfile {
            phone_number: form.phone_number,
            city_id: city.id,
            street_id: street.id,
            building_number: form.building_number,
            apartment_number: form.apartment_number,
        };

        let created = self.repository.accounts.create_with_profile(&account, &profile).await?;
        tracing::info!("Created inactive account id={}", created.id);

        self.send_activation(&created).await?;
        Ok(created)
    }

    async fn send_activation(&self, account: &Account) -> AppResult<()> {
        let uidb64 = tokens::encode_uid(account.id);
        let token = self.tokens.make_token(account)?;
        let body = email::activation_body(&account.username, &self.site, &uidb64, &token);
        self.mailer
            .send(email::ACTIVATION_SUBJECT, &body, &account.email)
            .await
    }

    /// Activate the account behind an emailed link and open a session for it.
    /// Every failure is reported as the same invalid-link error.
    pub async fn activate(&self, uidb64: &str, token: &str) -> AppResult<(Account, LoginResponse)> {
        let id = tokens::decode_uid(uidb64).ok_or(AppError::InvalidActivationLink)?;
        let account = self
            .repository
            .accounts
            .get_by_id(id)
            .await?
            .ok_or(AppError::InvalidActivationLink)?;

        if account.is_active || !self.tokens.check_token(&account, token) {
            return Err(AppError::InvalidActivationLink);
        }
        if !self.repository.accounts.activate(account.id).await? {
            return Err(AppError::InvalidActivationLink);
        }

        let account = Account {
            is_active: true,
            ..account
        };
        tracing::info!("Activated account id={}", account.id);
        let session = self.issue_session(&account)?;
        Ok((account, session))
    }

    /// Mail a fresh link to every inactive account registered with this address
    pub async fn resend_activation(&self, request: ResendActivation) -> AppResult<()> {
        request.validate()?;
        let accounts = self.repository.accounts.find_inactive_by_email(&request.email).await?;
        if accounts.is_empty() {
            tracing::debug!("No inactive account for activation resend");
        }
        for account in &accounts {
            self.send_activation(account).await?;
        }
        Ok(())
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let account = self
            .repository
            .accounts
            .get_by_username(&request.username)
            .await?
            .ok_or_else(|| AppError::Authentication(LOGIN_FAILED.to_string()))?;

        if !self.verify_password(&account, &request.password)? || !account.is_active {
            tracing::debug!("Login refused for account id={}", account.id);
            return Err(AppError::Authentication(LOGIN_FAILED.to_string()));
        }

        self.issue_session(&account)
    }

    fn issue_session(&self, account: &Account) -> AppResult<LoginResponse> {
        let claims = UserClaims::for_account(account, self.auth_config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.auth_config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.auth_config.jwt_expiration_hours as i64 * 3600,
        })
    }

    /// Account of a valid session. Deactivated or deleted accounts lose access.
    pub async fn me(&self, claims: &UserClaims) -> AppResult<Account> {
        self.repository
            .accounts
            .get_by_id(claims.user_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| AppError::Authentication("Account is no longer available".to_string()))
    }

    /// Staff only. Takes effect at the account's next login.
    #[tracing::instrument(skip(self))]
    pub async fn set_staff(&self, account_id: i32, is_staff: bool) -> AppResult<Account> {
        self.repository.accounts.set_staff(account_id, is_staff).await?;
        tracing::info!("Account {} staff flag set to {}", account_id, is_staff);
        self.repository
            .accounts
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", account_id)))
    }

    pub async fn profile(&self, account_id: i32) -> AppResult<ProfileView> {
        let account = self
            .repository
            .accounts
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", account_id)))?;

        let info = self.repository.profiles.get_info(account.id).await?;
        let address = match &info {
            Some(info) => self.repository.profiles.get_address_details(info.id).await?,
            None => None,
        };

        Ok(ProfileView {
            id: account.id,
            username: account.username,
            email: account.email,
            contact: info.map(|i| ContactInfo {
                phone_number: i.phone_number,
            }),
            address,
        })
    }

    /// Apply the present fields. Each record is written only if one of its
    /// fields changed.
    #[tracing::instrument(skip(self, changes))]
    pub async fn edit_profile(&self, account_id: i32, changes: ProfileChanges) -> AppResult<ProfileView> {
        changes.validate()?;

        let account = self
            .repository
            .accounts
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", account_id)))?;
        let info = self
            .repository
            .profiles
            .get_info(account.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contact info not found".to_string()))?;
        let mut address = self
            .repository
            .profiles
            .get_address(info.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

        let mut choices = Vec::new();
        if lookup::is_requested(changes.pick_city.as_deref(), changes.add_city.as_deref()) {
            let choice = lookup::choose(LookupTable::City, changes.pick_city.as_deref(), changes.add_city.as_deref())?;
            choices.push((LookupTable::City, choice));
        }
        if lookup::is_requested(changes.pick_street.as_deref(), changes.add_street.as_deref()) {
            let choice = lookup::choose(LookupTable::Street, changes.pick_street.as_deref(), changes.add_street.as_deref())?;
            choices.push((LookupTable::Street, choice));
        }
        // Picks only read, so a missing pick fails before an add creates a row
        choices.sort_by_key(|(_, choice)| matches!(choice, LookupChoice::Add(_)));

        let original = address.clone();
        for (table, choice) in choices {
            let id = self.lookups.resolve_choice(table, choice).await?.id;
            match table {
                LookupTable::City => address.city_id = id,
                LookupTable::Street => address.street_id = id,
            }
        }
        if let Some(building) = changes.building_number {
            address.building_number = building;
        }
        if let Some(apartment) = changes.apartment_number {
            address.apartment_number = apartment;
        }

        let update = ProfileUpdate {
            account_id: account.id,
            email: changes.email.filter(|e| *e != account.email),
            user_info_id: info.id,
            phone_number: changes.phone_number.filter(|p| *p != info.phone_number),
            address: (address != original).then_some(address),
        };
        if !update.is_empty() {
            self.repository.profiles.apply_update(&update).await?;
        }

        self.profile(account.id).await
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, account: &Account, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&account.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
