//! Input and output schemas for every ability in the catalog. Input schemas
//! are strict: properties are enumerated, unknown properties are rejected,
//! and required fields, enums, and bounds are enforced by dispatch before a
//! handler runs.

use serde_json::{json, Value};

pub fn get_meta_input() -> Value {
    json!({
        "type": "object",
        "required": ["id"],
        "properties": {
            "id": {
                "type": "integer",
                "description": "Post or page ID."
            },
            "type": {
                "type": "string",
                "enum": ["post", "page", "any"],
                "default": "any",
                "description": "Post type to query (default: any)."
            }
        },
        "additionalProperties": false
    })
}

pub fn get_meta_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "id": { "type": "integer" },
            "title": { "type": "string" },
            "url": { "type": "string" },
            "post_type": { "type": "string" },
            "seo_title": { "type": "string" },
            "seo_description": { "type": "string" },
            "focus_keyword": { "type": "string" },
            "robots": { "type": "array" },
            "canonical_url": { "type": "string" },
            "is_pillar": { "type": "boolean" },
            "is_cornerstone": { "type": "boolean" },
            "message": { "type": "string" }
        }
    })
}

pub fn update_meta_input() -> Value {
    json!({
        "type": "object",
        "required": ["id"],
        "properties": {
            "id": {
                "type": "integer",
                "description": "Post or page ID."
            },
            "seo_title": {
                "type": "string",
                "description": "Custom SEO title. Use variables like %title%, %sitename%, %sep%."
            },
            "seo_description": {
                "type": "string",
                "description": "Meta description (recommended: 150-160 characters)."
            },
            "focus_keyword": {
                "type": "string",
                "description": "Focus keyword(s). Separate multiple with commas."
            },
            "robots": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Robot meta tags: index, noindex, follow, nofollow, etc."
            },
            "canonical_url": {
                "type": "string",
                "description": "Custom canonical URL (leave empty to use default)."
            },
            "is_pillar": {
                "type": "boolean",
                "description": "Mark as pillar content."
            },
            "is_cornerstone": {
                "type": "boolean",
                "description": "Mark as cornerstone content."
            }
        },
        "additionalProperties": false
    })
}

pub fn update_meta_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "id": { "type": "integer" },
            "updated": { "type": "array" },
            "url": { "type": "string" },
            "message": { "type": "string" }
        }
    })
}

pub fn bulk_get_meta_input() -> Value {
    json!({
        "type": "object",
        "properties": {
            "post_type": {
                "type": "string",
                "enum": ["post", "page", "any"],
                "default": "any",
                "description": "Filter by post type: post, page, or any."
            },
            "per_page": {
                "type": "integer",
                "default": 20,
                "minimum": 1,
                "maximum": 100,
                "description": "Number of items per page (max 100)."
            },
            "page": {
                "type": "integer",
                "default": 1,
                "minimum": 1,
                "description": "Page number."
            },
            "missing_desc": {
                "type": "boolean",
                "default": false,
                "description": "Only return posts missing meta description."
            },
            "search": {
                "type": "string",
                "description": "Search in post titles."
            }
        },
        "additionalProperties": false
    })
}

pub fn bulk_get_meta_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "items": { "type": "array" },
            "total": { "type": "integer" },
            "page": { "type": "integer" },
            "pages": { "type": "integer" },
            "message": { "type": "string" }
        }
    })
}

pub fn list_options_input() -> Value {
    json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "default": 200,
                "minimum": 1,
                "maximum": 500,
                "description": "Maximum number of option names to return (max 500)."
            },
            "offset": {
                "type": "integer",
                "default": 0,
                "minimum": 0,
                "description": "Number of option names to skip."
            }
        },
        "additionalProperties": false
    })
}

pub fn list_options_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "options": { "type": "array", "items": { "type": "string" } },
            "total": { "type": "integer" },
            "message": { "type": "string" }
        }
    })
}

pub fn get_options_input() -> Value {
    json!({
        "type": "object",
        "required": ["names"],
        "properties": {
            "names": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Option names to fetch. Names outside the allowed prefix are skipped."
            }
        },
        "additionalProperties": false
    })
}

pub fn get_options_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "options": { "type": "object" },
            "message": { "type": "string" }
        }
    })
}

pub fn update_options_input() -> Value {
    json!({
        "type": "object",
        "required": ["options"],
        "properties": {
            "options": {
                "type": "object",
                "description": "Map of option name to new value. Names outside the allowed prefix are skipped."
            }
        },
        "additionalProperties": false
    })
}

pub fn update_options_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "updated": { "type": "array", "items": { "type": "string" } },
            "message": { "type": "string" }
        }
    })
}

pub fn log_query_input() -> Value {
    json!({
        "type": "object",
        "properties": {
            "per_page": {
                "type": "integer",
                "default": 20,
                "minimum": 1,
                "maximum": 200,
                "description": "Number of rows per page (max 200)."
            },
            "page": {
                "type": "integer",
                "default": 1,
                "minimum": 1,
                "description": "Page number."
            }
        },
        "additionalProperties": false
    })
}

pub fn log_query_output() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "items": { "type": "array" },
            "total": { "type": "integer" },
            "page": { "type": "integer" },
            "per_page": { "type": "integer" },
            "message": { "type": "string" }
        }
    })
}
