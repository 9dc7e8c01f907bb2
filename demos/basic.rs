use product_store::{ProductInput, ProductPatch, ProductStore};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), product_store::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::temp_dir().join("product_store_demo.json");
    let store = ProductStore::builder().path(&path).build_handle();

    let lamp = store.create(ProductInput {
        name: "Lamp".into(),
        description: "Brass desk lamp".into(),
        price: 39.9,
        quantity: 3,
    });
    let mug = store.create(ProductInput {
        name: "Mug".into(),
        description: "Stoneware, 350ml".into(),
        price: 8.5,
        quantity: 24,
    });

    // partial update keeps every other field
    store.update(&lamp.id, ProductPatch::price(34.9));
    println!("lamp after update = {:?}", store.find_one(&lamp.id));

    store.remove(&mug.id);
    println!("all = {:?}", store.find_all());
    println!("unknown = {:?}", store.update("no-such-id", ProductPatch::quantity(1)));

    let contents = std::fs::read_to_string(&path)?;
    println!("On-disk JSON:\n{contents}");
    println!("\nDebug output: {store:?}");

    let _ = std::fs::remove_file(&path);
    Ok(())
}
