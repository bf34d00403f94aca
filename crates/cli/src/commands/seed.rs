//! Seed the database with demo data.
//!
//! Safe to run repeatedly: products are keyed by product code, the company
//! row is upserted and the welcome notice is only written once.

use onandhome_core::{ProductStatus, Won};
use onandhome_server::db::company::CompanyRepository;
use onandhome_server::db::notices::NoticeRepository;
use onandhome_server::db::products::ProductRepository;
use onandhome_server::models::company::CompanyInfoInput;
use onandhome_server::models::product::ProductInput;
use tracing::info;

const WELCOME_TITLE: &str = "OnAndHome 오픈 안내";

/// (code, name, category, manufacturer, price, sale price, stock)
const DEMO_PRODUCTS: [(&str, &str, &str, &str, i64, Option<i64>, i32); 8] = [
    ("TV-OLED65", "65인치 OLED TV", "TV", "LG전자", 2_890_000, Some(2_490_000), 12),
    ("AU-SB500", "사운드바 5.1채널", "오디오", "삼성전자", 459_000, None, 30),
    ("RF-BESPOKE4", "4도어 냉장고 870L", "냉장고", "삼성전자", 2_190_000, Some(1_990_000), 8),
    ("DW-12P", "12인용 식기세척기", "식기세척기", "SK매직", 1_050_000, None, 5),
    ("WM-TROMM24", "드럼세탁기 24kg", "세탁기", "LG전자", 1_390_000, Some(1_250_000), 10),
    ("VC-JET90", "무선 청소기", "청소기", "삼성전자", 890_000, None, 0),
    ("AC-WHISEN", "스탠드 에어컨 18평", "에어컨", "LG전자", 2_350_000, None, 6),
    ("MC-BODYF", "안마의자 팬텀", "안마의자", "바디프랜드", 3_990_000, Some(3_490_000), 3),
];

/// Load demo products, company info and a welcome notice.
///
/// # Errors
///
/// Returns an error if the connection or an insert fails.
pub async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let products = ProductRepository::new(&pool);
    let mut created = 0;
    for (code, name, category, manufacturer, price, sale_price, stock) in DEMO_PRODUCTS {
        if products.code_exists(code).await? {
            continue;
        }
        products
            .create(&ProductInput {
                name: name.to_owned(),
                product_code: Some(code.to_owned()),
                description: Some(format!("{manufacturer} {name}")),
                price: Won::new(price),
                sale_price: sale_price.map(Won::new),
                stock,
                category: Some(category.to_owned()),
                manufacturer: Some(manufacturer.to_owned()),
                country: Some("대한민국".to_owned()),
                status: if stock > 0 {
                    ProductStatus::OnSale
                } else {
                    ProductStatus::SoldOut
                },
                thumbnail_image: None,
                detail_image: None,
            })
            .await?;
        created += 1;
    }
    info!(created, total = DEMO_PRODUCTS.len(), "Demo products seeded");

    CompanyRepository::new(&pool)
        .upsert(&CompanyInfoInput {
            company_name: "OnAndHome".to_owned(),
            ceo: Some("홍길동".to_owned()),
            fax: Some("02-000-0001".to_owned()),
            email: Some("help@onandhome.kr".to_owned()),
            address: Some("서울특별시 강남구 테헤란로 1".to_owned()),
            business_number: Some("000-00-00000".to_owned()),
            mail_order_number: Some("2026-서울강남-0000".to_owned()),
            privacy_officer: Some("홍길동".to_owned()),
            phone: Some("1588-0000".to_owned()),
        })
        .await?;
    info!("Company info seeded");

    let notices = NoticeRepository::new(&pool);
    if notices.list(Some(WELCOME_TITLE), Some(1)).await?.is_empty() {
        notices
            .create(
                WELCOME_TITLE,
                "관리자",
                "OnAndHome 온라인 스토어가 문을 열었습니다.",
            )
            .await?;
        info!("Welcome notice seeded");
    }

    Ok(())
}
