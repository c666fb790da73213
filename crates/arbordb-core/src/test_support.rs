//! Shared fixture hierarchy for unit tests.
//!
//! ```text
//! customer (1)  pk cid
//! ├── order (2)  pk oid, join cid
//! │   └── item (3)  pk iid, join oid
//! └── address (4)  pk aid, join cid
//! ```

use crate::model::{Collation, IndexDef, IndexId, Schema, SchemaBuilder, TableDef, TableId};

///
/// Fixture
///

pub(crate) struct Fixture {
    pub(crate) schema: Schema,
    pub(crate) customer: TableId,
    pub(crate) order: TableId,
    pub(crate) item: TableId,
    pub(crate) address: TableId,
    pub(crate) customer_name: IndexId,
    pub(crate) order_placed: IndexId,
    pub(crate) item_sku: IndexId,
    pub(crate) address_city: IndexId,
    pub(crate) address_geo: IndexId,
    pub(crate) name_placed: IndexId,
}

pub(crate) fn fixture() -> Fixture {
    let mut builder = SchemaBuilder::new();

    let customer = builder
        .add_table(
            TableDef::new("customer", 1)
                .column("cid")
                .column_with("name", Collation::CaseInsensitive)
                .primary_key(["cid"]),
        )
        .expect("customer should build");
    let order = builder
        .add_table(
            TableDef::new("order", 2)
                .column("oid")
                .column("cid")
                .column("placed")
                .primary_key(["oid"])
                .child_of(customer, ["cid"]),
        )
        .expect("order should build");
    let item = builder
        .add_table(
            TableDef::new("item", 3)
                .column("iid")
                .column("oid")
                .column("sku")
                .primary_key(["iid"])
                .child_of(order, ["oid"]),
        )
        .expect("item should build");
    let address = builder
        .add_table(
            TableDef::new("address", 4)
                .column("aid")
                .column("cid")
                .column("lat")
                .column("lon")
                .column("city")
                .primary_key(["aid"])
                .child_of(customer, ["cid"]),
        )
        .expect("address should build");

    let customer_name = builder
        .add_index(IndexDef::table("customer_name", customer).column("name"))
        .expect("customer_name should build");
    let order_placed = builder
        .add_index(IndexDef::table("order_placed", order).column("placed"))
        .expect("order_placed should build");
    let item_sku = builder
        .add_index(IndexDef::table("item_sku", item).column("sku"))
        .expect("item_sku should build");
    let address_city = builder
        .add_index(IndexDef::table("address_city", address).column("city"))
        .expect("address_city should build");
    let address_geo = builder
        .add_index(
            IndexDef::table("address_geo", address)
                .column("lat")
                .column("lon")
                .spatial(0, 2),
        )
        .expect("address_geo should build");
    let name_placed = builder
        .add_index(
            IndexDef::group("name_placed", order)
                .column_of(customer, "name")
                .column_of(order, "placed"),
        )
        .expect("name_placed should build");

    Fixture {
        schema: builder.build(),
        customer,
        order,
        item,
        address,
        customer_name,
        order_placed,
        item_sku,
        address_city,
        address_geo,
        name_placed,
    }
}
