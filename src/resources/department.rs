use serde_json::Value;

use super::Resource;
use crate::schema::{FieldSpec, Schema};

pub const COLLECTION: &str = "departments";

pub const LOCATIONS: &[&str] = &["New York", "San Francisco", "London"];

pub fn resource() -> Result<Resource, regex::Error> {
    let schema = Schema::new("Department")
        .field(FieldSpec::string("name").required("Name required").pattern(
            r"^[A-Za-z0-9 \-'’.,]{1,100}$",
            "Name can be maximum 100 characters and can contain only \
             letters, numbers, spaces, hyphens, apostrophes and periods",
        )?)
        .field(
            FieldSpec::string("code")
                .required("Code required")
                .unique("Code taken")
                .pattern(
                    r"^[A-Z0-9]{1,20}$",
                    "Code can be maximum 20 characters and can contain only \
                     numbers and capital letters",
                )?,
        )
        .field(
            FieldSpec::string("location")
                .one_of(LOCATIONS, "Location not currently valid")
                .required("Location required"),
        )
        .field(FieldSpec::boolean("isActive").default_value(Value::Bool(true)))
        .timestamps();

    Ok(Resource {
        collection: COLLECTION,
        schema,
    })
}
