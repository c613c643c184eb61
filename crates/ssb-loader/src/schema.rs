//! Fixed schemas for the five SSB tables
//!
//! Column order matches the field order of the dbgen `.tbl` export. Changing
//! either side without the other breaks the load.

/// How a raw field is coerced and bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Double,
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Double => "DOUBLE",
            ColumnType::String => "STRING",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

/// Ordered column list for one target table
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = ColumnType> + '_ {
        self.columns.iter().map(|c| c.ty)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Name of the flat file holding this table, e.g. `lineorder.tbl`
    pub fn file_name(&self) -> String {
        format!("{}.tbl", self.name)
    }
}

use ColumnType::{Integer, String as Text};

pub static DATE: TableSchema = TableSchema {
    name: "date",
    columns: &[
        col("d_datekey", Integer),
        col("d_date", Text),
        col("d_dayofweek", Text),
        col("d_month", Text),
        col("d_year", Integer),
        col("d_yearmonthnum", Integer),
        col("d_yearmonth", Text),
        col("d_daynuminweek", Integer),
        col("d_daynuminmonth", Integer),
        col("d_daynuminyear", Integer),
        col("d_monthnuminyear", Integer),
        col("d_weeknuminyear", Integer),
        col("d_sellingseason", Text),
        col("d_lastdayinweekfl", Integer),
        col("d_lastdayinmonthfl", Integer),
        col("d_holidayfl", Integer),
        col("d_weekdayfl", Integer),
    ],
};

pub static PART: TableSchema = TableSchema {
    name: "part",
    columns: &[
        col("p_partkey", Integer),
        col("p_name", Text),
        col("p_mfgr", Text),
        col("p_category", Text),
        col("p_brand1", Text),
        col("p_color", Text),
        col("p_type", Text),
        col("p_size", Text),
        col("p_container", Text),
    ],
};

pub static SUPPLIER: TableSchema = TableSchema {
    name: "supplier",
    columns: &[
        col("s_suppkey", Integer),
        col("s_name", Text),
        col("s_address", Text),
        col("s_city", Text),
        col("s_nation", Text),
        col("s_region", Text),
        col("s_phone", Text),
    ],
};

pub static CUSTOMER: TableSchema = TableSchema {
    name: "customer",
    columns: &[
        col("c_custkey", Integer),
        col("c_name", Text),
        col("c_address", Text),
        col("c_city", Text),
        col("c_nation", Text),
        col("c_region", Text),
        col("c_phone", Text),
        col("c_mktsegment", Text),
    ],
};

pub static LINEORDER: TableSchema = TableSchema {
    name: "lineorder",
    columns: &[
        col("lo_orderkey", Integer),
        col("lo_linenumber", Integer),
        col("lo_custkey", Integer),
        col("lo_partkey", Integer),
        col("lo_suppkey", Integer),
        col("lo_orderdate", Integer),
        col("lo_orderpriority", Text),
        col("lo_shippriority", Text),
        col("lo_quantity", Integer),
        col("lo_extendedprice", Integer),
        col("lo_ordtotalprice", Integer),
        col("lo_discount", Integer),
        col("lo_revenue", Integer),
        col("lo_supplycost", Integer),
        col("lo_tax", Integer),
        col("lo_commitdate", Integer),
        col("lo_shipmode", Text),
    ],
};

static ALL: [&TableSchema; 5] = [&DATE, &PART, &SUPPLIER, &CUSTOMER, &LINEORDER];

/// Every known table in canonical order
pub fn all() -> &'static [&'static TableSchema] {
    &ALL
}

/// Look a table up by name, ignoring case
pub fn lookup(name: &str) -> Option<&'static TableSchema> {
    ALL.iter()
        .copied()
        .find(|schema| schema.name.eq_ignore_ascii_case(name.trim()))
}
