// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use logfacade::Backend;
use logfacade::Formatter;
use logfacade::Logger;
use logfacade::append::syslog::SyslogSettings;
use logfacade::connection::Connection;

fn main() -> Result<(), logfacade::Error> {
    let settings = SyslogSettings {
        connection: Connection::from_url("udp://127.0.0.1:514"),
        facility: "local0".to_string(),
        format: "rfc5424".to_string(),
        tag: "demo".to_string(),
        ..SyslogSettings::default()
    };
    let logger = Logger::new(Backend::Syslog(settings), Formatter::default())?;

    logger.error("Hello error!")?;
    logger.warn("Hello warn!")?;
    logger.info("Hello info!")?;
    logger.close()
}
