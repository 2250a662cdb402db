use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::{
    CreateItemRequest, CreatePackageRequest, ItemAvailabilityResponse, PackageComponentRequest,
    UpdateItemRequest, UpdatePackageRequest,
};
use crate::models::{DateRange, InventoryItem, ItemStatus, Package, PackageComponent};
use crate::services::{availability, RentalError};
use crate::store::RentalStore;

/// Inventory items and packages.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn RentalStore>,
    max_rental_days: u32,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RentalStore>, max_rental_days: u32) -> Self {
        Self {
            store,
            max_rental_days,
        }
    }

    pub async fn create_item(&self, req: CreateItemRequest) -> Result<InventoryItem, RentalError> {
        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            brand: req.brand,
            model: req.model,
            description: req.description,
            category: req.category,
            total_quantity: req.total_quantity,
            price_per_day: req.price_per_day,
            status: ItemStatus::Active,
            version: 0,
            created_utc: now,
            updated_utc: now,
        };
        self.store.insert_item(&item).await?;
        tracing::info!(item_id = %item.id, name = %item.name, "Inventory item created");
        Ok(item)
    }

    pub async fn get_item(&self, id: &str) -> Result<InventoryItem, RentalError> {
        self.store
            .find_item(id)
            .await?
            .ok_or_else(|| RentalError::not_found("inventory item", id))
    }

    pub async fn list_items(&self, include_retired: bool) -> Result<Vec<InventoryItem>, RentalError> {
        self.store.list_items(include_retired).await
    }

    /// Lowering stock never touches existing bookings; it only limits new ones.
    pub async fn update_item(
        &self,
        id: &str,
        req: UpdateItemRequest,
    ) -> Result<InventoryItem, RentalError> {
        let mut item = self.get_item(id).await?;
        if let Some(name) = req.name {
            item.name = name;
        }
        if req.brand.is_some() {
            item.brand = req.brand;
        }
        if req.model.is_some() {
            item.model = req.model;
        }
        if req.description.is_some() {
            item.description = req.description;
        }
        if let Some(category) = req.category {
            item.category = category;
        }
        if let Some(total) = req.total_quantity {
            item.total_quantity = total;
        }
        if let Some(price) = req.price_per_day {
            item.price_per_day = price;
        }
        if let Some(status) = req.status {
            item.status = status;
        }
        item.updated_utc = Utc::now();

        self.store.update_item(&item).await?;
        tracing::info!(item_id = %item.id, "Inventory item updated");
        Ok(item)
    }

    /// Soft delete: retired items stay on past bookings but cannot be booked.
    pub async fn retire_item(&self, id: &str) -> Result<InventoryItem, RentalError> {
        let mut item = self.get_item(id).await?;
        item.status = ItemStatus::Retired;
        item.updated_utc = Utc::now();
        self.store.update_item(&item).await?;
        tracing::info!(item_id = %item.id, "Inventory item retired");
        Ok(item)
    }

    async fn components(
        &self,
        reqs: Vec<PackageComponentRequest>,
    ) -> Result<Vec<PackageComponent>, RentalError> {
        let mut components: Vec<PackageComponent> = Vec::with_capacity(reqs.len());
        for req in reqs {
            self.get_item(&req.item_id).await?;
            match components.iter_mut().find(|c| c.item_id == req.item_id) {
                Some(existing) => {
                    existing.quantity =
                        existing.quantity.checked_add(req.quantity).ok_or_else(|| {
                            RentalError::Validation(format!(
                                "component quantity for {} is out of range",
                                req.item_id
                            ))
                        })?
                }
                None => components.push(PackageComponent {
                    item_id: req.item_id,
                    quantity: req.quantity,
                }),
            }
        }
        Ok(components)
    }

    pub async fn create_package(&self, req: CreatePackageRequest) -> Result<Package, RentalError> {
        let components = self.components(req.components).await?;
        let now = Utc::now();
        let package = Package {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            description: req.description,
            components,
            price_per_day: req.price_per_day,
            status: ItemStatus::Active,
            created_utc: now,
            updated_utc: now,
        };
        self.store.insert_package(&package).await?;
        tracing::info!(package_id = %package.id, name = %package.name, "Package created");
        Ok(package)
    }

    pub async fn get_package(&self, id: &str) -> Result<Package, RentalError> {
        self.store
            .find_package(id)
            .await?
            .ok_or_else(|| RentalError::not_found("package", id))
    }

    pub async fn list_packages(&self, include_retired: bool) -> Result<Vec<Package>, RentalError> {
        self.store.list_packages(include_retired).await
    }

    pub async fn update_package(
        &self,
        id: &str,
        req: UpdatePackageRequest,
    ) -> Result<Package, RentalError> {
        let mut package = self.get_package(id).await?;
        if let Some(name) = req.name {
            package.name = name;
        }
        if req.description.is_some() {
            package.description = req.description;
        }
        if let Some(components) = req.components {
            package.components = self.components(components).await?;
        }
        if let Some(price) = req.price_per_day {
            package.price_per_day = price;
        }
        if let Some(status) = req.status {
            package.status = status;
        }
        package.updated_utc = Utc::now();

        self.store.update_package(&package).await?;
        tracing::info!(package_id = %package.id, "Package updated");
        Ok(package)
    }

    pub async fn retire_package(&self, id: &str) -> Result<Package, RentalError> {
        let mut package = self.get_package(id).await?;
        package.status = ItemStatus::Retired;
        package.updated_utc = Utc::now();
        self.store.update_package(&package).await?;
        tracing::info!(package_id = %package.id, "Package retired");
        Ok(package)
    }

    /// Read-only stock and price check for one item.
    pub async fn item_availability(
        &self,
        id: &str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        quantity: u32,
    ) -> Result<ItemAvailabilityResponse, RentalError> {
        let range = DateRange::bounded(start, end, self.max_rental_days)?;
        let item = self.get_item(id).await?;
        let existing = self.store.overlapping_reservations(&item.id, &range).await?;
        let reserved = availability::peak_reserved(&existing, &range);
        let remaining = item.total_quantity.saturating_sub(reserved);
        let quantity = quantity.max(1);

        Ok(ItemAvailabilityResponse {
            item_id: item.id,
            start_date: range.start,
            end_date: range.end,
            total_quantity: item.total_quantity,
            reserved,
            remaining,
            requested: quantity,
            available: item.status == ItemStatus::Active && quantity <= remaining,
            days: range.days(),
            price: availability::line_price(item.price_per_day, range.days(), quantity)?,
        })
    }
}
