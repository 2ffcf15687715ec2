//! Integration tests for matrix switcher and collaboration operations.
//!
//! These tests verify the exact command lines written to the device, index
//! translation in both directions, and that invalid arguments are rejected
//! before any connection is made.

mod common;

use avswitch_control::{CollaborationEndpoint, ExecutionMode, RoutedInput, VideoSwitcher};
use common::{SimDevice, channel, fast_config};

const ADDRESS: &str = "127.0.0.1";

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub fn switcher_for(device: &SimDevice) -> VideoSwitcher {
        VideoSwitcher::new(channel(fast_config(device.port)))
    }

    pub async fn shutdown(switcher: &VideoSwitcher) {
        switcher.channel().pool().shutdown().await;
    }
}

use helpers::*;

// ============================================================================
// Routing
// ============================================================================

mod routing {
    use super::*;

    #[tokio::test]
    async fn test_switch_input_translates_indices() {
        let device = SimDevice::switcher(None).await;
        let switcher = switcher_for(&device);

        let routed = switcher
            .switch_input(ADDRESS, "2", "3", ExecutionMode::Pooled)
            .await
            .unwrap();

        assert_eq!(
            routed,
            RoutedInput {
                input: "2:3".into(),
                output: Some("3".into()),
            }
        );
        assert_eq!(device.received(), vec!["Route 3 4\r\n".to_string()]);

        shutdown(&switcher).await;
    }

    #[tokio::test]
    async fn test_current_input_by_output_port() {
        let device = SimDevice::switcher(None).await;
        let switcher = switcher_for(&device);

        let routed = switcher
            .get_current_input_by_output_port(ADDRESS, "3", ExecutionMode::Pooled)
            .await
            .unwrap();

        assert_eq!(routed.input, "2:3");
        assert_eq!(routed.output, None);
        assert_eq!(device.received(), vec!["Route Get 4\r\n".to_string()]);

        shutdown(&switcher).await;
    }

    #[tokio::test]
    async fn test_negative_index_never_connects() {
        let device = SimDevice::switcher(None).await;
        let switcher = switcher_for(&device);

        let err = switcher
            .switch_input(ADDRESS, "-1", "3", ExecutionMode::Pooled)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let err = switcher
            .get_current_input_by_output_port(ADDRESS, "abc", ExecutionMode::Pooled)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        assert_eq!(device.accepts(), 0);
        assert_eq!(switcher.channel().pool().dial_count(), 0);

        shutdown(&switcher).await;
    }

    #[tokio::test]
    async fn test_zero_input_in_reply_is_protocol_error() {
        let device = SimDevice::start(None, |_| Some("Route|0\n".to_string())).await;
        let switcher = switcher_for(&device);

        let err = switcher
            .switch_input(ADDRESS, "0", "0", ExecutionMode::Pooled)
            .await
            .unwrap_err();

        assert!(err.is_protocol_error());
        shutdown(&switcher).await;
    }

    #[tokio::test]
    async fn test_error_reply_is_protocol_error() {
        let device = SimDevice::start(None, |_| Some("Error|Bad port\n".to_string())).await;
        let switcher = switcher_for(&device);

        let err = switcher
            .switch_input(ADDRESS, "1", "1", ExecutionMode::Pooled)
            .await
            .unwrap_err();

        assert!(err.is_protocol_error());
        assert!(err.to_string().contains("Bad port"));
        shutdown(&switcher).await;
    }
}

// ============================================================================
// Front Lock and Signal
// ============================================================================

mod panel {
    use super::*;

    #[tokio::test]
    async fn test_front_lock_on_and_off() {
        let device = SimDevice::switcher(None).await;
        let switcher = switcher_for(&device);

        switcher
            .set_front_lock(ADDRESS, true, ExecutionMode::Pooled)
            .await
            .unwrap();
        switcher
            .set_front_lock(ADDRESS, false, ExecutionMode::Pooled)
            .await
            .unwrap();

        assert_eq!(
            device.received(),
            vec!["Lock On\r\n".to_string(), "Lock Off\r\n".to_string()]
        );
        assert_eq!(device.accepts(), 1);

        shutdown(&switcher).await;
    }

    #[tokio::test]
    async fn test_front_lock_unexpected_reply() {
        let device = SimDevice::start(None, |_| Some("Route|1\n".to_string())).await;
        let switcher = switcher_for(&device);

        let err = switcher
            .set_front_lock(ADDRESS, true, ExecutionMode::Pooled)
            .await
            .unwrap_err();

        assert!(err.is_protocol_error());
        shutdown(&switcher).await;
    }

    #[tokio::test]
    async fn test_active_signal_after_banner() {
        let device = SimDevice::switcher(Some("Welcome\r")).await;
        let switcher = switcher_for(&device);

        let signal = switcher
            .get_active_signal_by_port(
                ADDRESS,
                "1",
                ExecutionMode::Transient { read_welcome: true },
            )
            .await
            .unwrap();

        assert_eq!(signal.payload(), "Signal|2|1");
        assert_eq!(signal.is_active(), Some(true));
        assert_eq!(device.received(), vec!["Signal 2\r\n".to_string()]);

        shutdown(&switcher).await;
    }
}

// ============================================================================
// Collaboration Endpoint
// ============================================================================

mod collaboration {
    use super::*;

    fn via_reply(command: &str) -> Option<String> {
        let reply = match command {
            "" => "Login Successful\n",
            "Vol Get" => "Vol|Get|42\n",
            "GetSerialNo" => "GetSerialNo|VIA123\n",
            "GetVersion" => "GetVersion|2.4.1\n",
            "GetMacAdd" => "GetMacAdd|00:11:22:33:44:55\n",
            "IpInfo" => "IpInfo|IP:10.0.0.9|GAT:10.0.0.1|DNS:10.0.0.2|Host:room-1\n",
            "PList all 4" => "PList|all|4|anna_1#ben_0#cara_2\n",
            _ => "Error|unknown\n",
        };
        Some(reply.to_string())
    }

    #[tokio::test]
    async fn test_collaboration_queries() -> anyhow::Result<()> {
        let device = SimDevice::start(None, via_reply).await;
        let endpoint = CollaborationEndpoint::new(channel(fast_config(device.port)));

        assert!(endpoint.is_connected(ADDRESS).await);
        assert_eq!(endpoint.volume(ADDRESS).await?, 42);

        let info = endpoint.hardware_info(ADDRESS).await?;
        assert_eq!(info.serial_number, "VIA123");
        assert_eq!(info.firmware_version, "2.4.1");
        assert_eq!(info.hostname, "room-1");
        assert_eq!(info.network.ip_address, "10.0.0.9");
        assert_eq!(info.network.mac_address, "00:11:22:33:44:55");

        let users = endpoint.users(ADDRESS).await?;
        assert_eq!(users.active_users, vec!["anna"]);
        assert_eq!(users.inactive_users, vec!["ben"]);
        assert_eq!(users.users_waiting, vec!["cara"]);

        // Every query is a fresh connection.
        assert_eq!(device.accepts(), 7);
        assert_eq!(endpoint.channel().pool().connection_count(), 0);

        endpoint.channel().pool().shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_not_connected() {
        let endpoint =
            CollaborationEndpoint::new(channel(fast_config(common::closed_port().await)));
        assert!(!endpoint.is_connected(ADDRESS).await);
        endpoint.channel().pool().shutdown().await;
    }
}
