//! Lending service: library units, issue and return

use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::loan::{CreateUnit, IssueUnit, LibraryUnit, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    config: LendingConfig,
}

impl LendingService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self { repository, config }
    }

    /// Create a loanable unit for an existing work
    pub async fn create_unit(&self, request: CreateUnit) -> AppResult<LibraryUnit> {
        let work = request.work;
        if !self.repository.catalog.exists(work).await? {
            return Err(AppError::NotFound(format!(
                "{} with id {} not found",
                work.kind.label(),
                work.id
            )));
        }
        let unit = self
            .repository
            .lending
            .create_unit(work, request.available.unwrap_or(true))
            .await?;
        tracing::info!("Created library unit id={} for {} {}", unit.id, work.kind, work.id);
        Ok(unit)
    }

    pub async fn list_units(&self) -> AppResult<Vec<LibraryUnit>> {
        self.repository.lending.list_units().await
    }

    pub async fn get_unit(&self, id: i32) -> AppResult<LibraryUnit> {
        self.repository
            .lending
            .get_unit(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library unit with id {} not found", id)))
    }

    pub async fn delete_unit(&self, id: i32) -> AppResult<()> {
        if !self.repository.lending.delete_unit(id).await? {
            return Err(AppError::NotFound(format!("Library unit with id {} not found", id)));
        }
        Ok(())
    }

    /// Issue a unit to an active account for `loan_days` (or the configured default)
    #[tracing::instrument(skip(self, request), fields(account_id = request.account_id))]
    pub async fn issue(&self, unit_id: i32, request: IssueUnit) -> AppResult<LoanDetails> {
        request.validate()?;

        let account = self
            .repository
            .accounts
            .get_by_id(request.account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", request.account_id)))?;
        if !account.is_active {
            return Err(AppError::Validation(format!(
                "User {} has not activated the account",
                account.username
            )));
        }

        let now = Utc::now();
        let days = request.loan_days.unwrap_or(self.config.default_loan_days);
        let status = self
            .repository
            .lending
            .issue(unit_id, account.id, now, now + Duration::days(days))
            .await?;
        tracing::info!("Issued unit {} to account {} until {}", unit_id, account.id, status.return_due);

        Ok(LoanDetails::from_status(status, now))
    }

    pub async fn return_unit(&self, unit_id: i32) -> AppResult<LoanDetails> {
        let now = Utc::now();
        let status = self.repository.lending.return_unit(unit_id, now).await?;
        let details = LoanDetails::from_status(status, now);
        if details.is_late {
            tracing::info!("Unit {} returned late by account {}", unit_id, details.account_id);
        }
        Ok(details)
    }

    /// Loan history of an account, most recent first
    pub async fn loans_for(&self, account_id: i32) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        Ok(self
            .repository
            .lending
            .statuses_for_account(account_id)
            .await?
            .into_iter()
            .map(|s| LoanDetails::from_status(s, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        address::{LookupTable, NewProfile},
        loan::WorkRef,
        user::NewAccount,
        work::{FictionBookFields, WorkFields, WorkKind},
    };

    struct Fixture {
        service: LendingService,
        repository: Repository,
        account_id: i32,
        work: WorkRef,
    }

    async fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        let city = repository
            .lookups
            .find_or_create(LookupTable::City, "Gdansk")
            .await
            .unwrap();
        let street = repository
            .lookups
            .find_or_create(LookupTable::Street, "Dluga")
            .await
            .unwrap();
        let account = repository
            .accounts
            .create_with_profile(
                &NewAccount {
                    username: "borrower".to_string(),
                    email: "borrower@example.com".to_string(),
                    password_hash: "x".to_string(),
                },
                &NewProfile {
                    phone_number: 1,
                    city_id: city.id,
                    street_id: street.id,
                    building_number: 1,
                    apartment_number: 1,
                },
            )
            .await
            .unwrap();
        repository.accounts.activate(account.id).await.unwrap();

        let work = repository
            .catalog
            .create(
                &WorkFields::FictionBook(FictionBookFields {
                    title: "The Cyberiad".to_string(),
                }),
                &[],
            )
            .await
            .unwrap();

        Fixture {
            service: LendingService::new(repository.clone(), LendingConfig::default()),
            repository,
            account_id: account.id,
            work: WorkRef::new(WorkKind::FictionBook, work.id()),
        }
    }

    fn issue_to(account_id: i32) -> IssueUnit {
        IssueUnit {
            account_id,
            loan_days: None,
        }
    }

    #[tokio::test]
    async fn unit_needs_an_existing_work() {
        let f = fixture().await;
        let err = f
            .service
            .create_unit(CreateUnit {
                work: WorkRef::new(WorkKind::Article, f.work.id),
                available: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn issue_and_return_cycle() {
        let f = fixture().await;
        let unit = f
            .service
            .create_unit(CreateUnit {
                work: f.work,
                available: None,
            })
            .await
            .unwrap();
        assert!(unit.available);

        let loan = f.service.issue(unit.id, issue_to(f.account_id)).await.unwrap();
        assert_eq!(loan.return_due - loan.issued_at, Duration::days(14));
        assert!(!loan.is_late);
        assert!(!f.service.get_unit(unit.id).await.unwrap().available);

        let again = f.service.issue(unit.id, issue_to(f.account_id)).await.unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        let returned = f.service.return_unit(unit.id).await.unwrap();
        assert!(returned.returned_at.is_some());
        assert!(f.service.get_unit(unit.id).await.unwrap().available);

        let twice = f.service.return_unit(unit.id).await.unwrap_err();
        assert!(matches!(twice, AppError::Conflict(_)));

        let history = f.service.loans_for(f.account_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn late_return_is_flagged() {
        let f = fixture().await;
        let unit = f
            .repository
            .lending
            .create_unit(f.work, true)
            .await
            .unwrap();
        let issued_at = Utc::now() - Duration::days(30);
        f.repository
            .lending
            .issue(unit.id, f.account_id, issued_at, issued_at + Duration::days(14))
            .await
            .unwrap();

        let history = f.service.loans_for(f.account_id).await.unwrap();
        assert!(history[0].is_late);

        let returned = f.service.return_unit(unit.id).await.unwrap();
        assert!(returned.is_late);
    }

    #[tokio::test]
    async fn inactive_or_missing_borrowers_are_refused() {
        let f = fixture().await;
        let unit = f.repository.lending.create_unit(f.work, true).await.unwrap();

        let missing = f.service.issue(unit.id, issue_to(9999)).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let bad_days = f
            .service
            .issue(
                unit.id,
                IssueUnit {
                    account_id: f.account_id,
                    loan_days: Some(0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(bad_days, AppError::Form(_)));

        let city = f.repository.lookups.find_or_create(LookupTable::City, "Gdansk").await.unwrap();
        let street = f.repository.lookups.find_or_create(LookupTable::Street, "Dluga").await.unwrap();
        let pending = f
            .repository
            .accounts
            .create_with_profile(
                &NewAccount {
                    username: "pending".to_string(),
                    email: "pending@example.com".to_string(),
                    password_hash: "x".to_string(),
                },
                &NewProfile {
                    phone_number: 2,
                    city_id: city.id,
                    street_id: street.id,
                    building_number: 2,
                    apartment_number: 2,
                },
            )
            .await
            .unwrap();
        let inactive = f.service.issue(unit.id, issue_to(pending.id)).await.unwrap_err();
        assert!(matches!(inactive, AppError::Validation(_)));
        assert!(f.service.get_unit(unit.id).await.unwrap().available);
    }

    #[tokio::test]
    async fn deleting_the_work_removes_its_units() {
        let f = fixture().await;
        let unit = f.repository.lending.create_unit(f.work, true).await.unwrap();
        f.repository.catalog.delete(f.work.kind, f.work.id).await.unwrap();

        let err = f.service.get_unit(unit.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            f.service.delete_unit(unit.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
