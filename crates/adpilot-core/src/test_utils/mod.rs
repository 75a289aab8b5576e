pub mod mock_graph_server;
pub mod mock_search_server;
