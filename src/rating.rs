//! Product rating maintenance.
//!
//! `products.rating` is a cached aggregate over the product's active
//! reviews. It is only ever written through [`recompute_product_rating`],
//! which callers run on the same connection (usually a transaction) as the
//! review mutation that invalidated it.

use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect,
};
use tracing::debug;

use crate::entities::{product, review};

/// Arithmetic mean of the grades, or 0.0 for an empty set.
pub fn mean_grade(grades: &[i32]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    let total: i64 = grades.iter().map(|grade| i64::from(*grade)).sum();
    total as f64 / grades.len() as f64
}

/// Reads the active grades of `product_id`, stores their mean in the
/// product row and returns it.
///
/// The result depends only on the current review rows, so calling it again
/// without an intervening review change writes the same value.
pub async fn recompute_product_rating<C>(db: &C, product_id: i32) -> Result<f64, DbErr>
where
    C: ConnectionTrait,
{
    let grades: Vec<i32> = review::Entity::find_active()
        .filter(review::Column::ProductId.eq(product_id))
        .select_only()
        .column(review::Column::Grade)
        .into_tuple()
        .all(db)
        .await?;

    let rating = mean_grade(&grades);

    product::Entity::update_many()
        .col_expr(product::Column::Rating, Expr::value(rating))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    debug!(product_id, rating, reviews = grades.len(), "Recomputed product rating");
    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_review_set_rates_zero() {
        assert_eq!(mean_grade(&[]), 0.0);
    }

    #[test]
    fn averages_grades() {
        assert_eq!(mean_grade(&[3, 5]), 4.0);
        assert_eq!(mean_grade(&[3]), 3.0);
        assert!((mean_grade(&[1, 2, 2]) - 5.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_is_order_independent() {
        assert_eq!(mean_grade(&[5, 1, 4, 2]), mean_grade(&[1, 2, 4, 5]));
    }
}
