//! Fixed MQTT protocol scaffold
//!
//! Topic layout under `grids/`:
//!
//! | Topic                              | Direction | Payload                  |
//! |------------------------------------|-----------|--------------------------|
//! | `grids/<device>/status`            | out       | `online` / `offline` LWT |
//! | `grids/<device>/tele/<key>`        | out       | `{"<key>": v, "unit": "raw"}` |
//! | `grids/<device>/cmnd/<module>`     | in        | `ON` / `OFF` / value     |
//! | `grids/<device>/stat/<module>`     | out       | echoed command           |
//! | `grids/broadcast/discover`         | in        | `SCAN`                   |
//! | `grids/discovery/<device>`         | out       | discovery document       |
//!
//! Templates use the same `{{TOKEN}}` syntax as catalog fragments.

pub const BANNER: &str = "/** GRIDS-IOT-V1 Auto-Generated Code */";

pub const CORE_INCLUDES: [&str; 3] = [
    "#include <PubSubClient.h>",
    "#include <ArduinoJson.h>",
    "#include <ArduinoOTA.h>",
];

pub const ESP32_INCLUDES: [&str; 2] = ["#include <WiFi.h>", "#include <ESPmDNS.h>"];

pub const ESP8266_INCLUDES: [&str; 2] = ["#include <ESP8266WiFi.h>", "#include <ESP8266mDNS.h>"];

/// Helper functions. Tokens: SIGNATURE, BOARD, VERSION, DISCOVERY_MODULES,
/// COMMAND_BRANCHES.
pub const HELPERS: &str = r#"void sendTelemetry(String key, float value) {
  JsonDocument doc;
  doc[key] = value;
  doc["unit"] = "raw";
  char buffer[256];
  serializeJson(doc, buffer);
  String topic = String("grids/") + device_id + "/tele/" + key;
  client.publish(topic.c_str(), buffer);
}

void publishDiscovery() {
  JsonDocument doc;
  doc["sig"] = "{{SIGNATURE}}";
  doc["device_id"] = device_id;
  doc["uid"] = ghost_identity;
  doc["board"] = "{{BOARD}}";
  doc["ver"] = "{{VERSION}}";

  JsonArray mods = doc["modules"].to<JsonArray>();
{{DISCOVERY_MODULES}}

  char buffer[1024];
  serializeJson(doc, buffer);
  String topic = String("grids/discovery/") + device_id;
  client.publish(topic.c_str(), buffer);
}

void callback(char* topic, byte* payload, unsigned int length) {
  String msg = "";
  for (unsigned int i = 0; i < length; i++) msg += (char)payload[i];
  Serial.print("[MQTT] "); Serial.print(topic); Serial.print(": "); Serial.println(msg);

  String topicStr = String(topic);

  // Discovery broadcast
  if (topicStr == "grids/broadcast/discover" && msg == "SCAN") {
    publishDiscovery();
    return;
  }

  // Command handling
  if (topicStr.startsWith(String("grids/") + device_id + "/cmnd/")) {
    String mod = topicStr.substring(topicStr.lastIndexOf('/') + 1);
{{COMMAND_BRANCHES}}
  }
}

void setupOTA() {
  ArduinoOTA.setHostname(device_id);
  ArduinoOTA.onStart([]() { Serial.println("Start updating"); });
  ArduinoOTA.onEnd([]() { Serial.println("\nEnd"); });
  ArduinoOTA.onProgress([](unsigned int progress, unsigned int total) {
    Serial.printf("Progress: %u%%\r", (progress / (total / 100)));
  });
  ArduinoOTA.onError([](ota_error_t error) {
    Serial.printf("Error[%u]: ", error);
  });
  ArduinoOTA.begin();
}

boolean reconnect() {
  String statusTopic = String("grids/") + device_id + "/status";
  if (client.connect(device_id, NULL, NULL, statusTopic.c_str(), 1, true, "offline")) {
    Serial.println("MQTT Connected");
    client.publish(statusTopic.c_str(), "online", true);
    client.subscribe((String("grids/") + device_id + "/cmnd/#").c_str());
    client.subscribe("grids/broadcast/discover");
    publishDiscovery();
    return true;
  }
  return false;
}
"#;

/// `setup()`. Token: MODULE_SETUP.
pub const SETUP: &str = r#"void setup() {
  Serial.begin(115200);

  // Connect WiFi (timeout 10s)
  WiFi.mode(WIFI_STA);
  WiFi.begin(ssid, password);
  int try_wifi = 0;
  while (WiFi.status() != WL_CONNECTED && try_wifi < 20) { delay(500); Serial.print("."); try_wifi++; }
  if (WiFi.status() == WL_CONNECTED) Serial.println("\nWiFi Connected");
  else Serial.println("\nWiFi Timeout");

  setupOTA();
  client.setServer(mqtt_server, mqtt_port);
  client.setCallback(callback);

{{MODULE_SETUP}}
}
"#;

/// Non-blocking `loop()`. Tokens: RECONNECT_INTERVAL, MODULE_LOOP.
pub const LOOP: &str = r#"unsigned long lastReconnect = 0;
void loop() {
  ArduinoOTA.handle();

  if (!client.connected()) {
    unsigned long now = millis();
    if (now - lastReconnect > {{RECONNECT_INTERVAL}}) {
      lastReconnect = now;
      if (reconnect()) { lastReconnect = 0; }
    }
  } else {
    client.loop();
  }

{{MODULE_LOOP}}
}
"#;

/// Default command body for ON/OFF actuators. Tokens: PIN_0, ON, OFF.
pub const SWITCH_COMMAND: &str = r#"if (msg == "ON") digitalWrite({{PIN_0}}, {{ON}});
if (msg == "OFF") digitalWrite({{PIN_0}}, {{OFF}});"#;

/// Acknowledgement published after every handled command.
pub const COMMAND_ACK: &str =
    r#"client.publish((String("grids/") + device_id + "/stat/" + mod).c_str(), msg.c_str());"#;
