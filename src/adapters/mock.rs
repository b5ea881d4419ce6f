use crate::data_models::{NormalizedProduct, Platform, ProductQuery};
use crate::money::Money;

const BASE_PRICE: Money = Money::from_cents(4999);
const PRICE_STEP_CENTS: i64 = 1500;
const ODD_DISCOUNT_CENTS: i64 = 2000;
const BOUND_MARGIN_CENTS: i64 = 500;
const FREE_SHIPPING_ABOVE: Money = Money::from_cents(2500);
const FLAT_SHIPPING: Money = Money::from_cents(599);

/// Deterministic stand-in products for `platform`, one per requested result
/// up to what a single live request to that platform could return.
///
/// The same query always yields the same list. Totals that would fall outside
/// the query bounds are pulled back inside them.
pub fn mock_products(platform: Platform, query: &ProductQuery) -> Vec<NormalizedProduct> {
    let (prefix, url_base) = match platform {
        Platform::Amazon => ("AMZ", "https://amazon.com/dp"),
        Platform::Ebay => ("EBAY", "https://www.ebay.com/itm"),
    };

    (1..=query.max_results().min(platform.page_size()))
        .map(|i| {
            let n = i as i64;
            let (price, shipping) = priced_within_bounds(
                Money::from_cents(BASE_PRICE.cents() + PRICE_STEP_CENTS * n - ODD_DISCOUNT_CENTS * (n % 2)),
                query,
            );
            let rating = (40 + 3 * (i % 3)) as f32 / 10.0;

            NormalizedProduct::new(
                platform,
                format!("{prefix}-MOCK-{i}"),
                format!("{} Product {i} - {} (Mock)", query.term(), platform.display_name()),
                price,
                shipping,
            )
            .with_rating(Some(rating))
            .with_review_count(50 * (i as u32 + 1))
            .with_url(format!("{url_base}/MOCK{i}"))
            .with_image_url(Some(format!("https://example.com/{platform}_image_{i}.jpg")))
            .with_condition(Some("New".to_string()))
            .as_mock()
        })
        .collect()
}

fn shipping_for(price: Money) -> Money {
    if price > FREE_SHIPPING_ABOVE {
        Money::ZERO
    } else {
        FLAT_SHIPPING
    }
}

/// Price and shipping whose total lies inside the query bounds.
fn priced_within_bounds(raw: Money, query: &ProductQuery) -> (Money, Money) {
    let price = within_bounds(raw, query);
    let shipping = shipping_for(price);

    match query.bounds().max {
        Some(max) if price + shipping > max => {
            if max >= shipping {
                (Money::from_cents(max.cents() - shipping.cents()), shipping)
            } else {
                // window too low to carry the flat rate
                (max, Money::ZERO)
            }
        }
        _ => (price, shipping),
    }
}

fn within_bounds(price: Money, query: &ProductQuery) -> Money {
    let bounds = query.bounds();
    let margin = Money::from_cents(BOUND_MARGIN_CENTS);
    let mut price = price;

    if let Some(min) = bounds.min {
        if price < min {
            price = min + margin;
        }
    }
    if let Some(max) = bounds.max {
        if price > max {
            price = Money::from_cents(max.cents() - margin.cents());
        }
    }
    // the margin can overshoot a narrow window
    if let Some(max) = bounds.max {
        price = price.min(max);
    }
    if let Some(min) = bounds.min {
        price = price.max(min);
    }
    price
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(products: &[NormalizedProduct]) -> Vec<i64> {
        products.iter().map(|p| p.price().cents()).collect()
    }

    #[test]
    fn generates_one_product_per_requested_result() {
        let query = ProductQuery::new("tablet").with_max_results(3);
        let products = mock_products(Platform::Amazon, &query);

        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "tablet Product 1 - Amazon (Mock)",
                "tablet Product 2 - Amazon (Mock)",
                "tablet Product 3 - Amazon (Mock)",
            ]
        );
        assert_eq!(cents(&products), [4499, 7999, 7499]);
        assert!(products.iter().all(|p| p.mock && p.platform == Platform::Amazon));
        assert_eq!(products[0].id, "AMZ-MOCK-1");
        assert_eq!(products[0].url, "https://amazon.com/dp/MOCK1");
        assert_eq!(products[0].rating, Some(4.3));
        assert_eq!(products[2].rating, Some(4.0));
        assert_eq!(products[1].review_count, 150);
        assert_eq!(products[0].shipping_cost(), Money::ZERO);
    }

    #[test]
    fn identical_queries_give_identical_products() {
        let query = ProductQuery::new("lamp")
            .with_max_results(7)
            .with_price_bounds(Some(Money::from_cents(6000)), None);
        assert_eq!(
            mock_products(Platform::Amazon, &query),
            mock_products(Platform::Amazon, &query)
        );
    }

    #[test]
    fn prices_are_pulled_inside_bounds() {
        let query = ProductQuery::new("lamp")
            .with_max_results(5)
            .with_price_bounds(Some(Money::from_cents(6000)), Some(Money::from_cents(9000)));
        let products = mock_products(Platform::Amazon, &query);

        // raw prices: 44.99 79.99 74.99 109.99 104.99
        assert_eq!(cents(&products), [6500, 7999, 7499, 8500, 8500]);
        assert!(products.iter().all(|p| query.bounds().contains(p.price())));
    }

    #[test]
    fn narrow_window_keeps_totals_inside_bounds() {
        let query = ProductQuery::new("pen")
            .with_max_results(2)
            .with_price_bounds(Some(Money::from_cents(1000)), Some(Money::from_cents(1200)));
        let products = mock_products(Platform::Amazon, &query);

        // 10.00 after clamping, plus 5.99 shipping, would overshoot 12.00
        assert_eq!(cents(&products), [601, 601]);
        assert_eq!(products[0].shipping_cost(), FLAT_SHIPPING);
        assert!(products.iter().all(|p| p.total_price() == Money::from_cents(1200)));
    }

    #[test]
    fn window_below_flat_shipping_drops_shipping() {
        let query = ProductQuery::new("pen")
            .with_max_results(1)
            .with_price_bounds(Some(Money::ZERO), Some(Money::from_cents(300)));
        let products = mock_products(Platform::Amazon, &query);

        assert_eq!(products[0].price(), Money::from_cents(300));
        assert_eq!(products[0].shipping_cost(), Money::ZERO);
        assert!(query.bounds().contains(products[0].total_price()));
    }

    #[test]
    fn output_never_exceeds_a_live_page() {
        let query = ProductQuery::new("cable").with_max_results(100);
        assert_eq!(mock_products(Platform::Amazon, &query).len(), 10);
        assert_eq!(mock_products(Platform::Ebay, &query).len(), 100);
    }
}
