//! Process-local store implementing every repository trait.
//!
//! Backs the service and API tests; semantics follow the PostgreSQL
//! repositories, including uniqueness rules and cascading deletes.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AccountRepository, CatalogRepository, LendingRepository, LookupRepository, ProfileRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        address::{AddressDetails, LibraryUserAddress, LibraryUserInfo, LookupEntry, LookupTable, NewProfile, ProfileUpdate},
        author::{Author, AuthorName},
        loan::{LibraryUnit, UnitStatus, WorkRef},
        user::{Account, NewAccount},
        work::{Work, WorkFields, WorkKind},
    },
};

#[derive(Debug, Clone)]
struct StoredWork {
    fields: WorkFields,
    author_ids: Vec<i32>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    accounts: BTreeMap<i32, Account>,
    infos: BTreeMap<i32, LibraryUserInfo>,
    addresses: BTreeMap<i32, LibraryUserAddress>,
    cities: BTreeMap<i32, LookupEntry>,
    streets: BTreeMap<i32, LookupEntry>,
    authors: BTreeMap<i32, Author>,
    works: HashMap<WorkRef, StoredWork>,
    units: BTreeMap<i32, LibraryUnit>,
    statuses: BTreeMap<i32, UnitStatus>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn lookup(&self, table: LookupTable) -> &BTreeMap<i32, LookupEntry> {
        match table {
            LookupTable::City => &self.cities,
            LookupTable::Street => &self.streets,
        }
    }

    fn lookup_mut(&mut self, table: LookupTable) -> &mut BTreeMap<i32, LookupEntry> {
        match table {
            LookupTable::City => &mut self.cities,
            LookupTable::Street => &mut self.streets,
        }
    }

    fn work(&self, work: WorkRef) -> Option<Work> {
        let stored = self.works.get(&work)?;
        let authors = stored
            .author_ids
            .iter()
            .filter_map(|id| self.authors.get(id).cloned())
            .collect();
        Some(Work::from_parts(work.id, stored.fields.clone(), authors))
    }

    fn remove_unit(&mut self, id: i32) -> bool {
        let removed = self.units.remove(&id).is_some();
        if removed {
            self.statuses.retain(|_, s| s.unit_id != id);
        }
        removed
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        self.lock().map(|_| ())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_inactive_by_email(&self, email: &str) -> AppResult<Vec<Account>> {
        let email = email.to_lowercase();
        Ok(self
            .lock()?
            .accounts
            .values()
            .filter(|a| !a.is_active && a.email.to_lowercase() == email)
            .cloned()
            .collect())
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        Ok(self.lock()?.accounts.values().any(|a| a.username == username))
    }

    async fn create_with_profile(&self, account: &NewAccount, profile: &NewProfile) -> AppResult<Account> {
        let mut state = self.lock()?;
        if state.accounts.values().any(|a| a.username == account.username) {
            return Err(AppError::Conflict("A user with that username already exists.".to_string()));
        }
        if !state.cities.contains_key(&profile.city_id) || !state.streets.contains_key(&profile.street_id) {
            return Err(AppError::Internal("Address references a missing city or street".to_string()));
        }

        let created = Account {
            id: state.next_id(),
            username: account.username.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            is_active: false,
            is_staff: false,
            date_joined: Utc::now(),
        };
        let info = LibraryUserInfo {
            id: state.next_id(),
            account_id: created.id,
            phone_number: profile.phone_number,
        };
        let address = LibraryUserAddress {
            id: state.next_id(),
            user_info_id: info.id,
            city_id: profile.city_id,
            street_id: profile.street_id,
            building_number: profile.building_number,
            apartment_number: profile.apartment_number,
        };

        state.accounts.insert(created.id, created.clone());
        state.infos.insert(info.id, info);
        state.addresses.insert(address.id, address);
        Ok(created)
    }

    async fn activate(&self, id: i32) -> AppResult<bool> {
        let mut state = self.lock()?;
        match state.accounts.get_mut(&id) {
            Some(account) if !account.is_active => {
                account.is_active = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_staff(&self, id: i32, is_staff: bool) -> AppResult<()> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        account.is_staff = is_staff;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_info(&self, account_id: i32) -> AppResult<Option<LibraryUserInfo>> {
        Ok(self
            .lock()?
            .infos
            .values()
            .find(|i| i.account_id == account_id)
            .cloned())
    }

    async fn get_address(&self, user_info_id: i32) -> AppResult<Option<LibraryUserAddress>> {
        Ok(self
            .lock()?
            .addresses
            .values()
            .find(|a| a.user_info_id == user_info_id)
            .cloned())
    }

    async fn get_address_details(&self, user_info_id: i32) -> AppResult<Option<AddressDetails>> {
        let state = self.lock()?;
        let Some(address) = state.addresses.values().find(|a| a.user_info_id == user_info_id) else {
            return Ok(None);
        };
        let (Some(city), Some(street)) = (state.cities.get(&address.city_id), state.streets.get(&address.street_id))
        else {
            return Ok(None);
        };
        Ok(Some(AddressDetails {
            building_number: address.building_number,
            apartment_number: address.apartment_number,
            city: city.name.clone(),
            street: street.name.clone(),
        }))
    }

    async fn apply_update(&self, update: &ProfileUpdate) -> AppResult<()> {
        let mut state = self.lock()?;

        // Every target must exist before anything is written
        if update.email.is_some() && !state.accounts.contains_key(&update.account_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", update.account_id)));
        }
        if update.phone_number.is_some() && !state.infos.contains_key(&update.user_info_id) {
            return Err(AppError::NotFound(format!("Contact info {} not found", update.user_info_id)));
        }
        if let Some(address) = &update.address {
            if !state.addresses.contains_key(&address.id) {
                return Err(AppError::NotFound(format!("Address {} not found", address.id)));
            }
        }

        if let Some(email) = &update.email {
            if let Some(account) = state.accounts.get_mut(&update.account_id) {
                account.email = email.clone();
            }
        }
        if let Some(phone_number) = update.phone_number {
            if let Some(info) = state.infos.get_mut(&update.user_info_id) {
                info.phone_number = phone_number;
            }
        }
        if let Some(address) = &update.address {
            state.addresses.insert(address.id, address.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl LookupRepository for MemoryStore {
    async fn find(&self, table: LookupTable, name: &str) -> AppResult<Option<LookupEntry>> {
        Ok(self
            .lock()?
            .lookup(table)
            .values()
            .find(|e| e.name == name)
            .cloned())
    }

    async fn find_or_create(&self, table: LookupTable, name: &str) -> AppResult<LookupEntry> {
        let mut state = self.lock()?;
        if let Some(existing) = state.lookup(table).values().find(|e| e.name == name) {
            return Ok(existing.clone());
        }
        let entry = LookupEntry {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.lookup_mut(table).insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list(&self, table: LookupTable) -> AppResult<Vec<LookupEntry>> {
        let mut entries: Vec<LookupEntry> = self.lock()?.lookup(table).values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list(&self, kind: WorkKind) -> AppResult<Vec<Work>> {
        let state = self.lock()?;
        let mut works: Vec<Work> = state
            .works
            .keys()
            .filter(|r| r.kind == kind)
            .filter_map(|r| state.work(*r))
            .collect();
        works.sort_by(|a, b| {
            a.fields()
                .title()
                .cmp(b.fields().title())
                .then(a.id().cmp(&b.id()))
        });
        Ok(works)
    }

    async fn get(&self, kind: WorkKind, id: i32) -> AppResult<Option<Work>> {
        Ok(self.lock()?.work(WorkRef::new(kind, id)))
    }

    async fn exists(&self, work: WorkRef) -> AppResult<bool> {
        Ok(self.lock()?.works.contains_key(&work))
    }

    async fn create(&self, fields: &WorkFields, authors: &[AuthorName]) -> AppResult<Work> {
        let mut state = self.lock()?;
        let id = state.next_id();
        let mut author_ids = Vec::with_capacity(authors.len());
        for author in authors {
            let author_id = state.next_id();
            state.authors.insert(
                author_id,
                Author {
                    id: author_id,
                    name: author.name.clone(),
                    surname: author.surname.clone(),
                },
            );
            author_ids.push(author_id);
        }

        let work = WorkRef::new(fields.kind(), id);
        state.works.insert(
            work,
            StoredWork {
                fields: fields.clone(),
                author_ids,
            },
        );
        state
            .work(work)
            .ok_or_else(|| AppError::Internal("Created work vanished".to_string()))
    }

    async fn update(&self, id: i32, fields: Option<&WorkFields>, renamed_authors: &[Author]) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(fields) = fields {
            let stored = state
                .works
                .get_mut(&WorkRef::new(fields.kind(), id))
                .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", fields.kind().label(), id)))?;
            stored.fields = fields.clone();
        }
        for author in renamed_authors {
            if let Some(stored) = state.authors.get_mut(&author.id) {
                stored.name = author.name.clone();
                stored.surname = author.surname.clone();
            }
        }
        Ok(())
    }

    async fn delete(&self, kind: WorkKind, id: i32) -> AppResult<bool> {
        let mut state = self.lock()?;
        let work = WorkRef::new(kind, id);
        if state.works.remove(&work).is_none() {
            return Ok(false);
        }
        let orphaned_units: Vec<i32> = state
            .units
            .values()
            .filter(|u| u.work == work)
            .map(|u| u.id)
            .collect();
        for unit_id in orphaned_units {
            state.remove_unit(unit_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl LendingRepository for MemoryStore {
    async fn create_unit(&self, work: WorkRef, available: bool) -> AppResult<LibraryUnit> {
        let mut state = self.lock()?;
        if !state.works.contains_key(&work) {
            return Err(AppError::NotFound(format!("{} with id {} not found", work.kind.label(), work.id)));
        }
        let unit = LibraryUnit {
            id: state.next_id(),
            work,
            available,
        };
        state.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn get_unit(&self, id: i32) -> AppResult<Option<LibraryUnit>> {
        Ok(self.lock()?.units.get(&id).cloned())
    }

    async fn list_units(&self) -> AppResult<Vec<LibraryUnit>> {
        Ok(self.lock()?.units.values().cloned().collect())
    }

    async fn delete_unit(&self, id: i32) -> AppResult<bool> {
        Ok(self.lock()?.remove_unit(id))
    }

    async fn issue(
        &self,
        unit_id: i32,
        account_id: i32,
        issued_at: DateTime<Utc>,
        return_due: DateTime<Utc>,
    ) -> AppResult<UnitStatus> {
        let mut state = self.lock()?;
        if !state.accounts.contains_key(&account_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", account_id)));
        }
        let unit = state
            .units
            .get_mut(&unit_id)
            .ok_or_else(|| AppError::NotFound(format!("Library unit with id {} not found", unit_id)))?;
        if !unit.available {
            return Err(AppError::Conflict(format!("Library unit {} is not available", unit_id)));
        }
        unit.available = false;

        let status = UnitStatus {
            id: state.next_id(),
            account_id,
            unit_id,
            issued_at,
            return_due,
            returned_at: None,
        };
        state.statuses.insert(status.id, status.clone());
        Ok(status)
    }

    async fn return_unit(&self, unit_id: i32, returned_at: DateTime<Utc>) -> AppResult<UnitStatus> {
        let mut state = self.lock()?;
        if !state.units.contains_key(&unit_id) {
            return Err(AppError::NotFound(format!("Library unit with id {} not found", unit_id)));
        }
        let status = state
            .statuses
            .values_mut()
            .find(|s| s.unit_id == unit_id && s.is_open())
            .ok_or_else(|| AppError::Conflict(format!("Library unit {} is not issued", unit_id)))?;
        status.returned_at = Some(returned_at);
        let status = status.clone();

        if let Some(unit) = state.units.get_mut(&unit_id) {
            unit.available = true;
        }
        Ok(status)
    }

    async fn statuses_for_account(&self, account_id: i32) -> AppResult<Vec<UnitStatus>> {
        let mut statuses: Vec<UnitStatus> = self
            .lock()?
            .statuses
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        statuses.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
        Ok(statuses)
    }
}
