// Copyright 2016 LambdaStack All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Sample access code and testing ground for the library.

use std::str;

use s3_core::{CannedAcl, ChainProvider, Client, ClientConfig, StaticProvider};

fn main() {
    // ChainProvider checks AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY first,
    // falling back to whatever is appended here.
    let provider = ChainProvider::new().with(StaticProvider::new("access-key", "secret-key"));

    let config = ClientConfig::builder("play.min.io")
        .credentials_from(&provider)
        .expect("credentials provider chain produced no credentials")
        .app_info("s3-core-demo", "0.1.0")
        .build()
        .expect("invalid client configuration");

    let client = Client::new(config).expect("failed to build HTTP transport");

    let bucket_name = "s3-core-demo-bucket";

    println!("------------------------make_bucket----------------------------------------");
    match client.make_bucket(bucket_name, CannedAcl::Private, "us-east-1") {
        Ok(()) => println!("created {}", bucket_name),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------put_bucket_acl--------------------------------------");
    match client.put_bucket_acl(bucket_name, CannedAcl::PublicRead) {
        Ok(()) => println!("acl set to public-read"),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------get_bucket_acl--------------------------------------");
    match client.get_bucket_acl(bucket_name) {
        Ok(canned) => println!("bucket acl: {}", canned),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------put_bytes--------------------------------------------");
    match client.put_bytes(bucket_name, "mytest.txt", b"this is a test.", Some("text/plain"), Some(CannedAcl::Private)) {
        Ok(etag) => println!("uploaded, etag={}", etag),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------get_object--------------------------------------------");
    match client.get_object(bucket_name, "mytest.txt") {
        Ok(bytes) => println!("body: {:?}", str::from_utf8(&bytes)),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------stat_object--------------------------------------------");
    match client.stat_object(bucket_name, "mytest.txt") {
        Ok(stat) => println!("stat: {:?}", stat),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------presigned_get_object------------------------------------");
    match client.presigned_get_object(bucket_name, "mytest.txt", 3600) {
        Ok(url) => println!("presigned url: {}", url),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------list_objects--------------------------------------------");
    match client.list_objects(bucket_name, None, None, None) {
        Ok(page) => println!("objects: {:#?}", page),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------remove_object-------------------------------------------");
    match client.remove_object(bucket_name, "mytest.txt") {
        Ok(()) => println!("removed mytest.txt"),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------remove_bucket-------------------------------------------");
    match client.remove_bucket(bucket_name) {
        Ok(()) => println!("removed {}", bucket_name),
        Err(e) => println!("error: {:?}", e),
    }

    println!("------------------------list_buckets---------------------------------------------");
    match client.list_buckets() {
        Ok(buckets) => println!("buckets: {:#?}", buckets),
        Err(e) => println!("error: {:?}", e),
    }
}
