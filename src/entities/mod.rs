pub mod category;
pub mod product;
pub mod review;
pub mod user;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Schema,
    Set, TransactionTrait,
};
use tracing::info;

use crate::entities::{
    category::Entity as Category, product::Entity as Product, review::Entity as Review,
    user::Entity as User,
};

/// Creates every table that is missing. Referenced tables go first.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_user_table = schema.create_table_from_entity(User);
    let mut create_category_table = schema.create_table_from_entity(Category);
    let mut create_product_table = schema.create_table_from_entity(Product);
    let mut create_review_table = schema.create_table_from_entity(Review);

    for statement in [
        create_user_table.if_not_exists(),
        create_category_table.if_not_exists(),
        create_product_table.if_not_exists(),
        create_review_table.if_not_exists(),
    ] {
        db.execute(backend.build(&*statement)).await?;
    }

    Ok(())
}

/// Inserts an admin account unless a user with that name already exists.
pub async fn seed_admin(db: &DatabaseConnection, username: &str, password: &str) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(&txn)
        .await?;
    if existing.is_some() {
        txn.rollback().await?;
        return Ok(());
    }

    let password_hash = user::hash_password(password)
        .map_err(|err| DbErr::Custom(format!("Failed to hash admin password: {err}")))?;

    let new_admin = user::ActiveModel {
        username: Set(username.to_owned()),
        password: Set(password_hash),
        role: Set(user::Role::Admin),
        is_active: Set(true),
        ..Default::default()
    };
    User::insert(new_admin).exec(&txn).await?;
    txn.commit().await?;

    info!(username = %username, "Seeded admin account");
    Ok(())
}
