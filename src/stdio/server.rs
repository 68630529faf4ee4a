use anyhow::Result;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, InitializeRequestParam, InitializeResult, ListPromptsResult,
        ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, PaginatedRequestParam,
        ProtocolVersion, ReadResourceRequestParam, ReadResourceResult, ServerCapabilities,
        ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use serde_json::json;
use std::sync::Arc;

use crate::tools::{ToolRegistry, ToolResponse};

/// Convert the registry's envelope into the MCP result type.
pub fn to_call_tool_result(response: ToolResponse) -> CallToolResult {
    let content: Vec<Content> = response
        .content
        .into_iter()
        .map(|item| Content::text(item.text))
        .collect();

    if response.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

/// MCP server exposing the schema tools over stdio.
///
/// Tool calls are independent: each runs as its own request task and checks
/// out its own pooled connection.
#[derive(Clone)]
pub struct StdioServer {
    registry: Arc<ToolRegistry>,
}

impl StdioServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Serve the stdio server until the client disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        log::info!("Starting stdio server");

        let service = self.serve(stdio()).await.inspect_err(|e| {
            log::error!("serving error: {e:?}");
        })?;
        service.waiting().await?;

        log::info!("Stdio server stopped");
        Ok(())
    }
}

impl ServerHandler for StdioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Read-only SQL Server schema exploration: schemas, tables, columns, indexes, \
                 foreign keys and best-effort CREATE TABLE scripts"
                    .to_string(),
            ),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let response = self.registry.call(&request.name, request.arguments).await;
        Ok(to_call_tool_result(response))
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools: Vec<Tool> = self
            .registry
            .tools()
            .map(|entry| {
                // Convert schema Value to Arc<JsonObject>
                let schema_obj = match entry.schema.clone() {
                    serde_json::Value::Object(obj) => Arc::new(obj),
                    _ => Arc::new(serde_json::Map::new()),
                };
                Tool::new(entry.name, entry.description, schema_obj)
            })
            .collect();

        log::debug!("Serving {} tools", tools.len());

        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn get_prompt(
        &self,
        _request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        Err(McpError::invalid_request("Prompts not supported", None))
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: vec![],
            next_cursor: None,
        })
    }

    /// Resources capability is not advertised; these exist only to satisfy
    /// the `ServerHandler` trait.
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        Err(McpError::invalid_request(
            "Resources not supported",
            Some(json!({
                "message": "This server only supports tools.",
                "uri": request.uri
            })),
        ))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }

    async fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        log::info!(
            "Client connected: {} {}",
            request.client_info.name,
            request.client_info.version
        );
        Ok(self.get_info())
    }
}
