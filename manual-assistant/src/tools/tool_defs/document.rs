//! Manual search tool definitions.

use std::collections::HashMap;

use crate::tools::registry::{ToolMetadata, ToolName};

pub fn register(registry: &mut HashMap<ToolName, ToolMetadata>) {
    let tool = perform_search();
    registry.insert(tool.name, tool);
}

fn perform_search() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::PerformSearch,
        description: "Obtain manuals or advisory guides in the mechanical field of any vehicle or automotive component. The response lists the matching documents; answer with the URL of each document, which is where the manual can be downloaded, and use its title and description to give more details.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "model": {
                        "type": "string",
                        "description": "La marca y el modelo, Renault, clio"
                    },
                    "year": {
                        "type": "string",
                        "description": "Fecha del modelo"
                    },
                    "search": {
                        "type": "string",
                        "description": "Elemento requerido, manual, esquema electrico"
                    }
                },
                "required": ["model", "year", "search"]
            })
        },
    }
}
