use serde_json::Value;

use super::{Resource, department};
use crate::schema::{FieldSpec, Schema};

pub const COLLECTION: &str = "employees";

const PERSON_NAME: &str = r"^[A-Za-zÀ-ÿ '’-]{1,100}$";

fn person_name_message(label: &str) -> String {
    format!(
        "{} can be a maximum of 100 characters and can contain only letters, \
         apostrophes, hyphens, and spaces between words",
        label
    )
}

fn person_name(field: &str, label: &str, required: &str) -> Result<FieldSpec, regex::Error> {
    FieldSpec::string(field)
        .required(required)
        .pattern(PERSON_NAME, &person_name_message(label))
}

pub fn resource() -> Result<Resource, regex::Error> {
    let schema = Schema::new("Employee")
        .field(person_name("firstName", "First name", "First name required")?)
        .field(person_name("lastName", "Last name", "Last name required")?)
        .field(person_name("title", "Job title", "Job title required")?)
        .field(
            FieldSpec::object_id("departmentId")
                .required("Department required")
                .references(department::COLLECTION, "Invalid department"),
        )
        .field(
            FieldSpec::string("email")
                .required("Email address required")
                .unique("Email address taken")
                .pattern(
                    r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$",
                    "Email address must have a valid format",
                )?,
        )
        .field(
            FieldSpec::string("countryCode")
                .required("Country code required")
                .pattern(
                    r"^[0-9]{1,4}$",
                    "Country code must be between 1 and 4 digits and contain only digits",
                )?,
        )
        .field(
            FieldSpec::string("phoneNumber")
                .required("Phone number required")
                .pattern(
                    r"^[0-9]{7,15}$",
                    "Phone number must be between 7 and 15 digits and contain only digits",
                )?,
        )
        .field(FieldSpec::boolean("isActive").default_value(Value::Bool(true)))
        .field(FieldSpec::date("hireDate").required("Hire date required"))
        .timestamps();

    Ok(Resource {
        collection: COLLECTION,
        schema,
    })
}
