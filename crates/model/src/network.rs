use serde::{Deserialize, Serialize};

/// Parameters of `GET /api/network/graph`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkGraphQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkNodeKind {
    Customer,
    Supplier,
    Buyer,
    #[serde(other)]
    Other,
}

/// Organisation in the customer/supplier graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub bin: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NetworkNodeKind,
    #[serde(default)]
    pub total_lots: u64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub high_risk_lots: u64,
}

/// Contracting relationship between two organisations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub lot_count: u64,
    #[serde(default)]
    pub lot_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkGraphStats {
    pub total_nodes: u64,
    pub total_edges: u64,
    pub customer_count: u64,
    pub supplier_count: u64,
}

/// Response of `GET /api/network/graph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    #[serde(default)]
    pub nodes: Vec<NetworkNode>,
    #[serde(default)]
    pub edges: Vec<NetworkEdge>,
    #[serde(default)]
    pub stats: NetworkGraphStats,
}

impl NetworkGraph {
    /// Edges touching the organisation with the given BIN.
    pub fn edges_of<'a>(&'a self, bin: &'a str) -> impl Iterator<Item = &'a NetworkEdge> {
        self.edges
            .iter()
            .filter(move |edge| edge.source == bin || edge.target == bin)
    }
}

/// Graph metrics of a single organisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeProfile {
    #[serde(rename = "type")]
    pub kind: String,
    pub degree: u64,
    pub centrality: f64,
    pub community_id: i64,
    pub total_contracts: u64,
}

/// Response of `GET /api/network/{bin}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnalysis {
    pub bin: String,
    #[serde(default)]
    pub node: NodeProfile,
    #[serde(default)]
    pub connections_count: u64,
    /// Relationship-derived signals, e.g. a repeat supplier-customer pairing
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub community_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_edges_of() {
        let graph: NetworkGraph = serde_json::from_value(serde_json::json!({
            "nodes": [
                {"bin": "111", "name": "Акимат", "type": "customer"},
                {"bin": "222", "name": "ТОО Поставщик", "type": "supplier"}
            ],
            "edges": [
                {"source": "111", "target": "222", "weight": 3.0, "lot_count": 3},
                {"source": "333", "target": "444"}
            ],
            "stats": {"total_nodes": 2, "total_edges": 2}
        }))
        .unwrap();

        assert_eq!(graph.nodes[1].kind, NetworkNodeKind::Supplier);
        assert_eq!(graph.edges_of("222").count(), 1);
        assert_eq!(graph.stats.customer_count, 0);
    }
}
